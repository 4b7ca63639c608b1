// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the packet run lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Execution start and finish
//! * Packet and receipt hashes
//! * Token usage summary
//! * Abort and archive hand-off

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::Span;

use crate::engine::tokens::TokenStats;
use crate::observability::messages::StructuredLog;
use crate::traits::observer::LogLevel;

/// Execution of a packet started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use ucp_runner::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     packet_id: "pkt_demo",
///     ucp_version: "0.1",
///     total_ops: 7,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Starting execution of packet pkt_demo (UCP 0.1, 7 operations)"
/// );
/// ```
pub struct ExecutionStarted<'a> {
    pub packet_id: &'a str,
    pub ucp_version: &'a str,
    pub total_ops: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting execution of packet {} (UCP {}, {} operations)",
            self.packet_id, self.ucp_version, self.total_ops
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            packet_id = self.packet_id,
            ucp_version = self.ucp_version,
            total_ops = self.total_ops,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            packet_id = self.packet_id,
            ucp_version = self.ucp_version,
            total_ops = self.total_ops,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Execution finished, successfully or not.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionFinished<'a> {
    pub packet_id: &'a str,
    pub status: &'a str,
    pub duration: Duration,
}

impl Display for ExecutionFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} in {}ms",
            self.status,
            self.duration.as_millis()
        )
    }
}

impl StructuredLog for ExecutionFinished<'_> {
    fn log(&self) {
        tracing::info!(
            packet_id = self.packet_id,
            status = self.status,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_finished",
            span_name = name,
            packet_id = self.packet_id,
            status = self.status,
            duration = ?self.duration,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Packet and receipt hashes were computed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct HashesComputed<'a> {
    pub packet_hash: &'a str,
    pub receipt_hash: &'a str,
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

impl Display for HashesComputed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Packet hash: {}... Receipt hash: {}...",
            short(self.packet_hash),
            short(self.receipt_hash)
        )
    }
}

impl StructuredLog for HashesComputed<'_> {
    fn log(&self) {
        tracing::info!(
            packet_hash = self.packet_hash,
            receipt_hash = self.receipt_hash,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "hashes",
            span_name = name,
            packet_hash = self.packet_hash,
            receipt_hash = self.receipt_hash,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }

    fn data(&self) -> Option<Value> {
        Some(json!({
            "packetHash": self.packet_hash,
            "receiptHash": self.receipt_hash,
        }))
    }
}

/// Token usage for the run; only emitted when tokens were spent.
///
/// # Log Level
/// `info!` - Important operational event
pub struct TokenUsage<'a> {
    pub stats: &'a TokenStats,
}

impl Display for TokenUsage<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Tokens used: {} ({} in, {} out)",
            self.stats.total_tokens, self.stats.input_tokens, self.stats.output_tokens
        )
    }
}

impl StructuredLog for TokenUsage<'_> {
    fn log(&self) {
        tracing::info!(
            total_tokens = self.stats.total_tokens,
            input_tokens = self.stats.input_tokens,
            output_tokens = self.stats.output_tokens,
            calls = self.stats.calls,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "token_usage",
            span_name = name,
            total_tokens = self.stats.total_tokens,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }

    fn data(&self) -> Option<Value> {
        serde_json::to_value(self.stats).ok()
    }
}

/// Tokens avoided through cached invocations.
///
/// # Log Level
/// `info!` - reported as `success` to observers
pub struct TokensSaved {
    pub saved: u64,
}

impl Display for TokensSaved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Tokens saved: {}", self.saved)
    }
}

impl StructuredLog for TokensSaved {
    fn log(&self) {
        tracing::info!(saved_tokens = self.saved, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("tokens_saved", span_name = name, saved_tokens = self.saved)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Success
    }
}

/// The run was aborted; remaining operations will not be dispatched.
///
/// # Log Level
/// `warn!` - Degraded operation
pub struct ExecutionAborted<'a> {
    pub packet_id: &'a str,
}

impl Display for ExecutionAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Execution of packet {} aborted", self.packet_id)
    }
}

impl StructuredLog for ExecutionAborted<'_> {
    fn log(&self) {
        tracing::warn!(packet_id = self.packet_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("execution_aborted", span_name = name, packet_id = self.packet_id)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Warning
    }
}

/// Handing the receipt to the archive failed. The receipt is still returned.
///
/// # Log Level
/// `warn!` - Degraded operation
pub struct ArchiveFailed<'a> {
    pub receipt_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ArchiveFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to archive receipt {}: {}", self.receipt_id, self.error)
    }
}

impl StructuredLog for ArchiveFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            receipt_id = self.receipt_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "archive_failed",
            span_name = name,
            receipt_id = self.receipt_id,
            error = %self.error,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashes_are_shortened_for_display() {
        let packet_hash = "a".repeat(64);
        let receipt_hash = "b".repeat(64);
        let msg = HashesComputed {
            packet_hash: &packet_hash,
            receipt_hash: &receipt_hash,
        };
        assert_eq!(
            msg.to_string(),
            format!("Packet hash: {}... Receipt hash: {}...", "a".repeat(16), "b".repeat(16))
        );
        assert_eq!(msg.data().unwrap()["receiptHash"], receipt_hash);
    }

    #[test]
    fn test_levels() {
        assert_eq!(TokensSaved { saved: 3 }.level(), LogLevel::Success);
        assert_eq!(
            ExecutionAborted { packet_id: "p" }.to_entry().level,
            LogLevel::Warning
        );
    }
}
