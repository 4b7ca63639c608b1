// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{DriverError, ResolutionError, ValidationError};

/// The error recorded in an operation's `ERROR` result entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Driver(DriverError),

    /// The run was aborted before or while this operation ran.
    #[error("Execution aborted")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<DriverError> for OperationError {
    fn from(error: DriverError) -> Self {
        match error {
            DriverError::Cancelled => OperationError::Cancelled,
            other => OperationError::Driver(other),
        }
    }
}

/// Packet-level failures. Everything else ends up inside a receipt.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Packet validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// An engine instance runs exactly one packet.
    #[error("This engine has already executed a packet")]
    AlreadyStarted,

    #[error("Receipt serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_cancellation_maps_to_operation_cancellation() {
        assert_eq!(
            OperationError::from(DriverError::Cancelled),
            OperationError::Cancelled
        );
        assert!(matches!(
            OperationError::from(DriverError::UnknownNamespace("x".into())),
            OperationError::Driver(_)
        ));
    }

    #[test]
    fn test_messages() {
        let err = OperationError::from(ResolutionError::UnknownOpId {
            id: "missing".into(),
        });
        assert_eq!(
            err.to_string(),
            "Unresolved template: no result for opId 'missing'"
        );

        let err = ExecutionError::Validation(vec![
            ValidationError::MissingField {
                field: "id".into(),
            },
            ValidationError::InvalidOpName {
                path: "ops[0]".into(),
                op: "nodot".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Packet validation failed: Missing required field 'id'; ops[0]: invalid op 'nodot', expected <namespace>.<method>"
        );

        assert_eq!(
            DriverError::Timeout {
                operation: "wait.until".into(),
                ms: 50
            }
            .to_string(),
            "wait.until timeout after 50ms"
        );
    }
}
