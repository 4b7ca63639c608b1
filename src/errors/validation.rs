// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Structural problems found in a packet before execution.
///
/// Every variant that points at a location carries a JSON path such as
/// `ops[2].then[0]`, so a single validation pass can report all problems.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required top-level field is missing or empty
    MissingField { field: String },
    /// A top-level field has the wrong type
    InvalidField { field: String, expected: String },
    /// The packet (or an operation) is not a JSON object
    NotAnObject { path: String },
    /// A standard operation has no `op` field
    MissingOpName { path: String },
    /// A standard operation's `op` is not `namespace.method`
    InvalidOpName { path: String, op: String },
    /// The `type` field names no known control-flow construct
    UnknownOperationType { path: String, kind: String },
    /// A conditional has no `condition`
    MissingCondition { path: String },
    /// A required child-operation array is missing, empty, or not an array
    MissingChildren { path: String, field: String },
    /// A loop has none of `items`, `count`, `range`
    MissingIterationSource { path: String },
    /// A loop `range` is not a two-element numeric array
    InvalidRange { path: String },
    /// Control-flow nesting exceeds the configured limit
    NestingTooDeep { path: String, max_depth: usize },
    /// The document could not be decoded into the packet model
    Malformed { reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField { field } => {
                write!(f, "Missing required field '{}'", field)
            }
            ValidationError::InvalidField { field, expected } => {
                write!(f, "Field '{}' must be {}", field, expected)
            }
            ValidationError::MissingCondition { path } => {
                write!(f, "{}: conditional op is missing 'condition'", path)
            }
            ValidationError::NotAnObject { path } => {
                write!(f, "{}: expected an object", path)
            }
            ValidationError::MissingOpName { path } => {
                write!(f, "{}: standard operation is missing 'op'", path)
            }
            ValidationError::InvalidOpName { path, op } => {
                write!(
                    f,
                    "{}: invalid op '{}', expected <namespace>.<method>",
                    path, op
                )
            }
            ValidationError::UnknownOperationType { path, kind } => {
                write!(f, "{}: unknown operation type '{}'", path, kind)
            }
            ValidationError::MissingChildren { path, field } => {
                write!(f, "{}: '{}' must be a non-empty array of operations", path, field)
            }
            ValidationError::MissingIterationSource { path } => {
                write!(f, "{}: loop requires one of 'items', 'count' or 'range'", path)
            }
            ValidationError::InvalidRange { path } => {
                write!(f, "{}: 'range' must be [start, end]", path)
            }
            ValidationError::NestingTooDeep { path, max_depth } => {
                write!(
                    f,
                    "{}: control-flow nesting exceeds the limit of {}",
                    path, max_depth
                )
            }
            ValidationError::Malformed { reason } => {
                write!(f, "Malformed packet: {}", reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
