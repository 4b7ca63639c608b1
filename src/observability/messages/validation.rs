// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for packet validation failures.

use std::fmt::{Display, Formatter};

use serde_json::{json, Value};
use tracing::Span;

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use crate::traits::observer::LogLevel;

/// A packet was refused before any operation ran.
///
/// # Log Level
/// `error!` - Packet cannot be executed
///
/// # Example
/// ```
/// use ucp_runner::observability::messages::validation::PacketRejected;
///
/// let msg = PacketRejected {
///     packet_id: Some("pkt_1"),
///     error_count: 2,
/// };
///
/// assert_eq!(msg.to_string(), "Packet pkt_1 rejected with 2 validation errors");
/// ```
pub struct PacketRejected<'a> {
    pub packet_id: Option<&'a str>,
    pub error_count: usize,
}

impl Display for PacketRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Packet {} rejected with {} validation errors",
            self.packet_id.unwrap_or("<unknown>"),
            self.error_count
        )
    }
}

impl StructuredLog for PacketRejected<'_> {
    fn log(&self) {
        tracing::error!(
            packet_id = self.packet_id.unwrap_or(""),
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "packet_rejected",
            span_name = name,
            error_count = self.error_count,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Error
    }
}

/// One structural problem found in a packet.
///
/// # Log Level
/// `error!` - Packet cannot be executed
pub struct ValidationIssue<'a> {
    pub error: &'a ValidationError,
}

impl Display for ValidationIssue<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.error)
    }
}

impl StructuredLog for ValidationIssue<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "validation_issue",
            span_name = name,
            error = %self.error,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Error
    }

    fn data(&self) -> Option<Value> {
        Some(json!({ "error": self.error.to_string() }))
    }
}
