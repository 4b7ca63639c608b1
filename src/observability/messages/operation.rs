// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for operation lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Operation start, completion, skip and failure
//! * Control-flow decisions (branches, iterations, races, catch blocks)

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::packet::canonicalize;
use crate::traits::observer::LogLevel;

/// An operation was picked up by the engine.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use ucp_runner::observability::messages::operation::OperationStarted;
///
/// let msg = OperationStarted {
///     index: 3,
///     label: "http.get",
///     op_id: Some("fetch"),
/// };
///
/// assert_eq!(msg.to_string(), "[3] Executing: http.get");
/// ```
pub struct OperationStarted<'a> {
    pub index: usize,
    pub label: &'a str,
    pub op_id: Option<&'a str>,
}

impl Display for OperationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Executing: {}", self.index, self.label)
    }
}

impl StructuredLog for OperationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            op = self.label,
            op_id = self.op_id.unwrap_or(""),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation",
            span_name = name,
            index = self.index,
            op = self.label,
            op_id = self.op_id.unwrap_or(""),
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }

    fn data(&self) -> Option<Value> {
        self.op_id.map(|id| json!({ "opId": id }))
    }
}

/// Arguments after template resolution.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ArgsResolved<'a> {
    pub index: usize,
    pub args: &'a Value,
}

impl Display for ArgsResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Args: {}", self.index, canonicalize(self.args))
    }
}

impl StructuredLog for ArgsResolved<'_> {
    fn log(&self) {
        tracing::debug!(index = self.index, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("args_resolved", span_name = name, index = self.index)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }

    fn data(&self) -> Option<Value> {
        Some(self.args.clone())
    }
}

/// A guard (`skipIf` / `runIf`) prevented dispatch.
///
/// # Log Level
/// `info!` - Important operational event
pub struct OperationSkipped<'a> {
    pub index: usize,
    pub label: &'a str,
    pub reason: &'a str,
}

impl Display for OperationSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Skipped {}: {}", self.index, self.label, self.reason)
    }
}

impl StructuredLog for OperationSkipped<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            op = self.label,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation_skipped",
            span_name = name,
            index = self.index,
            op = self.label,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// An operation finished with status OK.
///
/// # Log Level
/// `info!` - reported as `success` to observers
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ucp_runner::observability::messages::operation::OperationCompleted;
///
/// let msg = OperationCompleted {
///     index: 0,
///     label: "local.put",
///     duration: Duration::from_millis(2),
/// };
///
/// assert_eq!(msg.to_string(), "[0] Completed local.put in 2ms");
/// ```
pub struct OperationCompleted<'a> {
    pub index: usize,
    pub label: &'a str,
    pub duration: Duration,
}

impl Display for OperationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Completed {} in {}ms",
            self.index,
            self.label,
            self.duration.as_millis()
        )
    }
}

impl StructuredLog for OperationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            op = self.label,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation_completed",
            span_name = name,
            index = self.index,
            op = self.label,
            duration = ?self.duration,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Success
    }
}

/// An operation finished with status ERROR.
///
/// # Log Level
/// `error!` - Operation failure
pub struct OperationFailed<'a> {
    pub index: usize,
    pub label: &'a str,
    pub error: &'a dyn std::error::Error,
    pub continued: bool,
}

impl Display for OperationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Failed {}: {}", self.index, self.label, self.error)?;
        if self.continued {
            write!(f, " (continuing)")?;
        }
        Ok(())
    }
}

impl StructuredLog for OperationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            index = self.index,
            op = self.label,
            error = %self.error,
            continued = self.continued,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "operation_failed",
            span_name = name,
            index = self.index,
            op = self.label,
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

/// An operation observed the abort signal before or during dispatch.
///
/// # Log Level
/// `warn!` - Degraded operation
pub struct OperationCancelled<'a> {
    pub index: usize,
    pub label: &'a str,
}

impl Display for OperationCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Cancelled {}", self.index, self.label)
    }
}

impl StructuredLog for OperationCancelled<'_> {
    fn log(&self) {
        tracing::warn!(index = self.index, op = self.label, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "operation_cancelled",
            span_name = name,
            index = self.index,
            op = self.label,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Warning
    }
}

/// A conditional picked a branch.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConditionalEvaluated<'a> {
    pub index: usize,
    pub result: bool,
    pub branch: &'a str,
}

impl Display for ConditionalEvaluated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Condition evaluated to {}, taking {} branch",
            self.index, self.result, self.branch
        )
    }
}

impl StructuredLog for ConditionalEvaluated<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            condition_result = self.result,
            branch = self.branch,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "conditional",
            span_name = name,
            index = self.index,
            branch = self.branch,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// A loop resolved its iteration source.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LoopStarted<'a> {
    pub index: usize,
    pub keyword: &'a str,
    pub iterations: usize,
}

impl Display for LoopStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Starting {} with {} iterations",
            self.index, self.keyword, self.iterations
        )
    }
}

impl StructuredLog for LoopStarted<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            keyword = self.keyword,
            iterations = self.iterations,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "loop",
            span_name = name,
            index = self.index,
            iterations = self.iterations,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// One loop iteration is about to run its body.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct LoopIteration {
    pub index: usize,
    pub iteration: usize,
    pub total: usize,
}

impl Display for LoopIteration {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Iteration {}/{}",
            self.index,
            self.iteration + 1,
            self.total
        )
    }
}

impl StructuredLog for LoopIteration {
    fn log(&self) {
        tracing::debug!(
            index = self.index,
            iteration = self.iteration,
            total = self.total,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "loop_iteration",
            span_name = name,
            index = self.index,
            iteration = self.iteration,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

/// A loop ended before exhausting its items.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LoopStopped<'a> {
    pub index: usize,
    pub iteration: usize,
    pub reason: &'a str,
}

impl Display for LoopStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Loop stopped after iteration {}: {}",
            self.index,
            self.iteration + 1,
            self.reason
        )
    }
}

impl StructuredLog for LoopStopped<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            iteration = self.iteration,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "loop_stopped",
            span_name = name,
            index = self.index,
            reason = self.reason,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// A parallel block launched its branches.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ParallelStarted<'a> {
    pub index: usize,
    pub count: usize,
    pub mode: &'a str,
}

impl Display for ParallelStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Running {} operations in parallel ({})",
            self.index, self.count, self.mode
        )
    }
}

impl StructuredLog for ParallelStarted<'_> {
    fn log(&self) {
        tracing::info!(
            index = self.index,
            count = self.count,
            mode = self.mode,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "parallel",
            span_name = name,
            index = self.index,
            count = self.count,
            mode = self.mode,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// First branch of a race settled.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RaceWon {
    pub index: usize,
    pub winner: usize,
}

impl Display for RaceWon {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Race won by branch {}", self.index, self.winner)
    }
}

impl StructuredLog for RaceWon {
    fn log(&self) {
        tracing::info!(index = self.index, winner = self.winner, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("race", span_name = name, index = self.index, winner = self.winner)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// A try block caught a failure from its body.
///
/// # Log Level
/// `warn!` - Degraded operation
pub struct TryCaught<'a> {
    pub index: usize,
    pub error: &'a str,
}

impl Display for TryCaught<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Caught error: {}", self.index, self.error)
    }
}

impl StructuredLog for TryCaught<'_> {
    fn log(&self) {
        tracing::warn!(index = self.index, error = self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("try_caught", span_name = name, index = self.index)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Warning
    }
}

/// Entering a nested block (`then`, `else`, `catch`, `finally`, ...).
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct BlockEntered<'a> {
    pub index: usize,
    pub block: &'a str,
    pub ops: usize,
}

impl Display for BlockEntered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Entering {} block ({} operations)",
            self.index, self.block, self.ops
        )
    }
}

impl StructuredLog for BlockEntered<'_> {
    fn log(&self) {
        tracing::debug!(
            index = self.index,
            block = self.block,
            ops = self.ops,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "block",
            span_name = name,
            index = self.index,
            block = self.block,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }
}
