// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures raised while dispatching a standard operation to a driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Unknown driver namespace: {0}")]
    UnknownNamespace(String),

    #[error("Unknown {namespace} method: {method}")]
    UnknownMethod { namespace: String, method: String },

    /// Arguments are missing or have the wrong shape.
    #[error("{op}: {reason}")]
    InvalidArgs { op: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{operation} timeout after {ms}ms")]
    Timeout { operation: String, ms: u64 },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("LLM invocation failed: {0}")]
    Llm(String),

    /// The capability has no collaborator wired into the runtime.
    #[error("No {0} service is configured")]
    NotConfigured(String),

    #[error("Execution aborted")]
    Cancelled,
}

impl DriverError {
    pub fn invalid_args(op: &str, reason: impl Into<String>) -> Self {
        DriverError::InvalidArgs {
            op: op.to_string(),
            reason: reason.into(),
        }
    }
}
