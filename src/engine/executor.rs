// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Packet execution engine.
//!
//! The engine walks a packet's operation tree on a single logical thread of
//! control. Standard operations are dispatched through the [`DriverRouter`];
//! the four control operations are interpreted here:
//!
//! - **conditional / if**: evaluate `condition` once and run exactly one branch
//! - **loop / foreach**: run the body sequentially per item of `items`,
//!   `count` or `range`, with a derived loop context per iteration
//! - **parallel**: run children concurrently and join them per mode
//!   (all, `allSettled`, `race`)
//! - **try**: run the body until the first failure, then `catch`, then
//!   always `finally`
//!
//! # Execution Flow
//!
//! 1. **Validation**: the packet is re-validated; nothing runs on failure
//! 2. **Walk**: each operation allocates its execution index when it starts,
//!    resolves guards and templates, dispatches, and commits its result
//! 3. **Receipt**: outcomes are sealed into a hashed [`Receipt`]
//! 4. **Archive**: the packet and receipt are handed to the archive, if any
//!
//! Failures are data: every run that passes validation produces a receipt.
//! Errors stop the smallest enclosing sequence unless the failing operation
//! sets `continueOnError`, is a `try` block, or runs under an absorbing
//! `parallel` block.
//!
//! # Cancellation
//!
//! [`ExecutionEngine::abort`] trips a shared [`CancellationToken`]. Every
//! operation checks it when it starts, and the same token is handed to
//! drivers so in-flight I/O can stop early. An engine instance runs exactly
//! one packet.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use ucp_runner::config::{Collaborators, EngineConfig};
//! use ucp_runner::drivers::DriverRouter;
//! use ucp_runner::engine::{ExecutionEngine, ReceiptStatus};
//! use ucp_runner::packet::Packet;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let packet = Packet::from_value(json!({
//!     "ucp_version": "0.1",
//!     "id": "pkt_doc",
//!     "ops": [
//!         {"op": "transform.set", "id": "a", "args": {"value": 5}},
//!         {"op": "transform.set", "args": {"value": "{{opId.a.value}}-ok"}}
//!     ]
//! }))
//! .map_err(|errors| format!("{:?}", errors))?;
//!
//! let config = Arc::new(EngineConfig::default());
//! let router = Arc::new(DriverRouter::with_standard_drivers(
//!     &Collaborators::default(),
//!     &config,
//! ));
//!
//! let engine = ExecutionEngine::new(packet, router, config);
//! let receipt = engine.execute().await?;
//!
//! assert_eq!(receipt.status, ReceiptStatus::Success);
//! assert_eq!(receipt.op_results[1].output.as_ref().unwrap()["value"], json!("5-ok"));
//! assert!(receipt.verify());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::{join_all, select_all, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::loader::EngineConfig;
use crate::config::validation::validate_packet_with_limit;
use crate::drivers::DriverRouter;
use crate::engine::condition::evaluate_condition;
use crate::engine::receipt::{IterationOutcome, OpOutcome, OutcomeDetail, Receipt};
use crate::engine::result_store::{OpStatus, ResultStore};
use crate::engine::template::{resolve, LoopContext};
use crate::engine::tokens::{estimate_tokens, TokenStats, TokenTracker};
use crate::errors::{ArchiveError, ExecutionError, OperationError, ResolutionError};
use crate::observability::messages::engine::{
    ArchiveFailed, ExecutionAborted, ExecutionFinished, ExecutionStarted, HashesComputed,
    TokenUsage, TokensSaved,
};
use crate::observability::messages::operation::{
    ArgsResolved, BlockEntered, ConditionalEvaluated, LoopIteration, LoopStarted, LoopStopped,
    OperationCancelled, OperationCompleted, OperationFailed, OperationSkipped, OperationStarted,
    ParallelStarted, RaceWon, TryCaught,
};
use crate::observability::messages::validation::{PacketRejected, ValidationIssue};
use crate::observability::messages::StructuredLog;
use crate::packet::canonical::{number_value, to_number};
use crate::packet::{ConditionalOp, LoopOp, OpKind, Operation, Packet, ParallelOp, StandardOp, TryOp};
use crate::traits::{DispatchContext, ExecutionObserver, NoopObserver, PacketArchive};

/// Tokens a naive run would spend shipping the whole packet once per
/// top-level operation.
pub fn baseline_tokens(packet: &Packet, chars_per_token: u64) -> u64 {
    let text = serde_json::to_string(packet).unwrap_or_default();
    estimate_tokens(&text, chars_per_token) * packet.ops.len() as u64
}

/// Runs one packet and produces its receipt.
pub struct ExecutionEngine {
    packet: Packet,
    router: Arc<DriverRouter>,
    config: Arc<EngineConfig>,
    observer: Arc<dyn ExecutionObserver>,
    archive: Option<Arc<dyn PacketArchive>>,
    store: ResultStore,
    tokens: TokenTracker,
    cancel: CancellationToken,
    started: AtomicBool,
    completed: AtomicUsize,
    total_ops: usize,
}

/// Bookkeeping captured when an operation begins running.
struct OpStart<'a> {
    index: usize,
    op: &'a Operation,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl<'a> OpStart<'a> {
    fn new(index: usize, op: &'a Operation) -> Self {
        Self {
            index,
            op,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn finish(
        &self,
        status: OpStatus,
        output: Option<Value>,
        error: Option<String>,
        detail: OutcomeDetail,
    ) -> OpOutcome {
        OpOutcome {
            index: self.index,
            op: match self.op {
                Operation::Standard(standard) => Some(standard.op.clone()),
                _ => None,
            },
            op_id: self.op.id().map(str::to_string),
            kind: self.op.kind(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            status,
            output,
            error,
            detail,
        }
    }
}

/// A loop's iteration source. `count` and `range` items are computed from
/// the iteration index, never collected up front.
enum LoopSource {
    Items(Vec<Value>),
    Count(usize),
    Range { first: f64, len: usize },
}

impl LoopSource {
    fn len(&self) -> usize {
        match self {
            LoopSource::Items(items) => items.len(),
            LoopSource::Count(len) | LoopSource::Range { len, .. } => *len,
        }
    }

    fn item(&self, i: usize) -> Value {
        match self {
            LoopSource::Items(items) => items.get(i).cloned().unwrap_or(Value::Null),
            LoopSource::Count(_) => json!(i),
            LoopSource::Range { first, .. } => number_value(first + i as f64),
        }
    }
}

fn status_of(failed: bool) -> OpStatus {
    if failed {
        OpStatus::Error
    } else {
        OpStatus::Ok
    }
}

fn any_error(outcomes: &[OpOutcome]) -> bool {
    outcomes.iter().any(|outcome| outcome.status.is_error())
}

fn outcomes_value<T: serde::Serialize>(outcomes: &T) -> Value {
    serde_json::to_value(outcomes).unwrap_or(Value::Null)
}

impl ExecutionEngine {
    pub fn new(packet: Packet, router: Arc<DriverRouter>, config: Arc<EngineConfig>) -> Self {
        let total_ops = packet.total_ops();
        let tokens = TokenTracker::with_baseline(baseline_tokens(
            &packet,
            config.llm.get_chars_per_token(),
        ));
        Self {
            packet,
            router,
            config,
            observer: Arc::new(NoopObserver),
            archive: None,
            store: ResultStore::new(),
            tokens,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            total_ops,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn PacketArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop dispatching. Operations that start afterwards fail with a
    /// cancellation error; drivers observe the same signal.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn results(&self) -> &ResultStore {
        &self.store
    }

    pub fn token_stats(&self) -> TokenStats {
        self.tokens.stats()
    }

    /// Control nodes plus all statically nested children.
    pub fn total_ops(&self) -> usize {
        self.total_ops
    }

    /// Run the packet to completion (or abort) and return the sealed receipt.
    ///
    /// Only validation and serialization problems surface as `Err`; every
    /// operation failure is recorded in the receipt instead.
    pub async fn execute(&self) -> Result<Receipt, ExecutionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ExecutionError::AlreadyStarted);
        }
        self.validate()?;

        let started = ExecutionStarted {
            packet_id: &self.packet.id,
            ucp_version: &self.packet.ucp_version,
            total_ops: self.total_ops,
        };
        let span = started.span("execute");
        self.emit(&started);

        let started_at = Utc::now();
        let clock = Instant::now();
        let op_results = self
            .run_block(&self.packet.ops, &LoopContext::new(), false)
            .instrument(span)
            .await;
        let finished_at = Utc::now();

        if self.cancel.is_cancelled() {
            self.emit(&ExecutionAborted {
                packet_id: &self.packet.id,
            });
        }
        self.observer.on_progress(self.total_ops, self.total_ops);

        let receipt = Receipt::seal(
            self.packet.id.clone(),
            started_at,
            finished_at,
            op_results,
            self.packet.content_hash()?,
            self.tokens.stats(),
        )?;

        self.emit(&ExecutionFinished {
            packet_id: &receipt.packet_id,
            status: receipt.status.as_str(),
            duration: clock.elapsed(),
        });
        self.emit(&HashesComputed {
            packet_hash: &receipt.packet_hash,
            receipt_hash: &receipt.receipt_hash,
        });
        if receipt.token_stats.total_tokens > 0 {
            self.emit(&TokenUsage {
                stats: &receipt.token_stats,
            });
            if receipt.token_stats.saved_tokens > 0 {
                self.emit(&TokensSaved {
                    saved: receipt.token_stats.saved_tokens,
                });
            }
        }

        self.archive_run(&receipt).await;
        Ok(receipt)
    }

    fn validate(&self) -> Result<(), ExecutionError> {
        let raw = self.packet.to_value()?;
        validate_packet_with_limit(&raw, self.config.limits.get_max_nesting_depth()).map_err(
            |errors| {
                self.emit(&PacketRejected {
                    packet_id: Some(&self.packet.id),
                    error_count: errors.len(),
                });
                for error in &errors {
                    self.emit(&ValidationIssue { error });
                }
                ExecutionError::Validation(errors)
            },
        )
    }

    async fn archive_run(&self, receipt: &Receipt) {
        let Some(archive) = &self.archive else {
            return;
        };
        let stored = async {
            archive.save_packet(&self.packet).await?;
            archive.save_receipt(receipt).await?;
            archive.record_run(&self.packet.id, receipt.status).await?;
            Ok::<(), ArchiveError>(())
        }
        .await;
        if let Err(error) = stored {
            self.emit(&ArchiveFailed {
                receipt_id: &receipt.receipt_id,
                error: &error,
            });
        }
    }

    fn emit(&self, message: &dyn StructuredLog) {
        message.log();
        self.observer.on_log(&message.to_entry());
    }

    fn advance(&self) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.observer
            .on_progress(done.min(self.total_ops), self.total_ops);
    }

    /// Run a sequence, stopping after the first failure unless `keep_going`,
    /// the failing operation's own `continueOnError`, or it being a `try`
    /// block says otherwise. After an abort, the next operation records the
    /// cancellation and the sequence ends.
    async fn run_block(
        &self,
        ops: &[Operation],
        ctx: &LoopContext,
        keep_going: bool,
    ) -> Vec<OpOutcome> {
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            if self.cancel.is_cancelled() {
                outcomes.push(self.run_op(op, ctx).await);
                break;
            }
            let outcome = self.run_op(op, ctx).await;
            let halt = outcome.status.is_error()
                && !keep_going
                && !op.continue_on_error()
                && op.kind() != OpKind::Try;
            outcomes.push(outcome);
            if halt {
                break;
            }
        }
        outcomes
    }

    fn run_op<'a>(&'a self, op: &'a Operation, ctx: &'a LoopContext) -> BoxFuture<'a, OpOutcome> {
        async move {
            let start = OpStart::new(self.store.next_index(), op);
            if self.cancel.is_cancelled() {
                return self.fail(&start, OperationError::Cancelled);
            }
            match op {
                Operation::Standard(standard) => self.run_standard(standard, start, ctx).await,
                Operation::Conditional(conditional) => {
                    self.run_conditional(conditional, start, ctx).await
                }
                Operation::Loop(looped) => self.run_loop(looped, start, ctx).await,
                Operation::Parallel(parallel) => self.run_parallel(parallel, start, ctx).await,
                Operation::Try(tried) => self.run_try(tried, start, ctx).await,
            }
        }
        .boxed()
    }

    fn announce(&self, start: &OpStart<'_>) -> tracing::Span {
        let message = OperationStarted {
            index: start.index,
            label: start.op.label(),
            op_id: start.op.id(),
        };
        self.emit(&message);
        message.span("operation")
    }

    fn fail(&self, start: &OpStart<'_>, error: OperationError) -> OpOutcome {
        let message = error.to_string();
        self.store.set(
            start.index,
            start.op.id(),
            json!({ "error": message }),
            OpStatus::Error,
        );
        if matches!(error, OperationError::Cancelled) {
            self.emit(&OperationCancelled {
                index: start.index,
                label: start.op.label(),
            });
        } else {
            self.emit(&OperationFailed {
                index: start.index,
                label: start.op.label(),
                error: &error,
                continued: start.op.continue_on_error(),
            });
        }
        self.advance();
        start.finish(
            OpStatus::Error,
            None,
            Some(message),
            OutcomeDetail::Standard {},
        )
    }

    /// Commit a finished control operation.
    fn settle(
        &self,
        start: &OpStart<'_>,
        status: OpStatus,
        output: Value,
        error: Option<String>,
        detail: OutcomeDetail,
    ) -> OpOutcome {
        self.store.set(start.index, start.op.id(), output, status);
        if status.is_error() {
            let failure = OperationError::InvalidOperation(
                error
                    .clone()
                    .unwrap_or_else(|| "a nested operation failed".to_string()),
            );
            self.emit(&OperationFailed {
                index: start.index,
                label: start.op.label(),
                error: &failure,
                continued: start.op.continue_on_error(),
            });
        } else {
            self.emit(&OperationCompleted {
                index: start.index,
                label: start.op.label(),
                duration: start.clock.elapsed(),
            });
        }
        self.advance();
        start.finish(status, None, error, detail)
    }

    async fn run_standard(
        &self,
        standard: &StandardOp,
        start: OpStart<'_>,
        ctx: &LoopContext,
    ) -> OpOutcome {
        let span = self.announce(&start);

        match self.skip_reason(standard, ctx) {
            Ok(Some(reason)) => return self.skip(&start, reason),
            Ok(None) => {}
            Err(error) => return self.fail(&start, error.into()),
        }

        let Some((namespace, method)) = standard.namespace_and_method() else {
            return self.fail(
                &start,
                OperationError::InvalidOperation(format!(
                    "'{}' is not <namespace>.<method>",
                    standard.op
                )),
            );
        };

        let args = match self.resolve_args(standard, namespace, method, ctx) {
            Ok(args) => args,
            Err(error) => return self.fail(&start, error.into()),
        };
        self.emit(&ArgsResolved {
            index: start.index,
            args: &args,
        });

        let dispatch = DispatchContext {
            cancel: &self.cancel,
            store: &self.store,
            loop_context: ctx,
            tokens: &self.tokens,
        };
        let result = self
            .router
            .dispatch(namespace, method, args, dispatch)
            .instrument(span)
            .await;

        match result {
            Ok(output) => {
                self.store
                    .set(start.index, standard.id.as_deref(), output.clone(), OpStatus::Ok);
                self.emit(&OperationCompleted {
                    index: start.index,
                    label: &standard.op,
                    duration: start.clock.elapsed(),
                });
                self.advance();
                if namespace == "llm" {
                    self.observer.on_token_update(&self.tokens.stats());
                }
                start.finish(OpStatus::Ok, Some(output), None, OutcomeDetail::Standard {})
            }
            Err(error) => self.fail(&start, error.into()),
        }
    }

    fn skip_reason(
        &self,
        standard: &StandardOp,
        ctx: &LoopContext,
    ) -> Result<Option<&'static str>, ResolutionError> {
        if let Some(condition) = &standard.skip_if {
            if evaluate_condition(condition, &self.store, ctx)? {
                return Ok(Some("skipIf condition met"));
            }
        }
        if let Some(condition) = &standard.run_if {
            if !evaluate_condition(condition, &self.store, ctx)? {
                return Ok(Some("runIf condition not met"));
            }
        }
        Ok(None)
    }

    fn skip(&self, start: &OpStart<'_>, reason: &str) -> OpOutcome {
        let output = json!({ "skipped": true, "reason": reason });
        self.store
            .set(start.index, start.op.id(), output.clone(), OpStatus::Skipped);
        self.emit(&OperationSkipped {
            index: start.index,
            label: start.op.label(),
            reason,
        });
        self.advance();
        start.finish(OpStatus::Skipped, Some(output), None, OutcomeDetail::Standard {})
    }

    /// Resolve templates in `args`, leaving the driver's deferred keys as
    /// written.
    fn resolve_args(
        &self,
        standard: &StandardOp,
        namespace: &str,
        method: &str,
        ctx: &LoopContext,
    ) -> Result<Value, ResolutionError> {
        let deferred = self.router.deferred_args(namespace, method);
        match &standard.args {
            Value::Null => Ok(Value::Object(Map::new())),
            Value::Object(map) if !deferred.is_empty() => map
                .iter()
                .map(|(key, value)| {
                    let resolved = if deferred.contains(&key.as_str()) {
                        value.clone()
                    } else {
                        resolve(value, &self.store, ctx)?
                    };
                    Ok((key.clone(), resolved))
                })
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            other => resolve(other, &self.store, ctx),
        }
    }

    async fn run_conditional(
        &self,
        conditional: &ConditionalOp,
        start: OpStart<'_>,
        ctx: &LoopContext,
    ) -> OpOutcome {
        let span = self.announce(&start);

        let condition_result = match evaluate_condition(&conditional.condition, &self.store, ctx) {
            Ok(result) => result,
            Err(error) => return self.fail(&start, error.into()),
        };
        let (branch, ops) = if condition_result {
            ("then", conditional.then.as_slice())
        } else {
            ("else", conditional.else_.as_deref().unwrap_or(&[]))
        };
        self.emit(&ConditionalEvaluated {
            index: start.index,
            result: condition_result,
            branch,
        });
        if !ops.is_empty() {
            self.emit(&BlockEntered {
                index: start.index,
                block: branch,
                ops: ops.len(),
            });
        }

        let results = self
            .run_block(ops, ctx, conditional.continue_on_error)
            .instrument(span)
            .await;
        let output = json!({
            "conditionResult": condition_result,
            "branch": branch,
            "results": outcomes_value(&results),
        });
        self.settle(
            &start,
            status_of(any_error(&results)),
            output,
            None,
            OutcomeDetail::Conditional {
                condition_result,
                branch: branch.to_string(),
                branch_results: results,
            },
        )
    }

    /// Pick the iteration source: `items`, then `count`, then `range`.
    fn loop_source(
        &self,
        looped: &LoopOp,
        ctx: &LoopContext,
    ) -> Result<LoopSource, OperationError> {
        if let Some(items) = looped.items.as_ref().filter(|items| !items.is_null()) {
            return Ok(LoopSource::Items(match resolve(items, &self.store, ctx)? {
                Value::Array(items) => items,
                Value::String(text) => split_items(&text),
                _ => Vec::new(),
            }));
        }

        if let Some(count) = looped.count.as_ref().filter(|count| !count.is_null()) {
            let count = to_number(&resolve(count, &self.store, ctx)?);
            let count = if count.is_finite() && count > 0.0 {
                count.floor() as usize
            } else {
                0
            };
            return Ok(LoopSource::Count(count));
        }

        if let Some(range) = looped.range.as_ref() {
            let range = resolve(range, &self.store, ctx)?;
            let (first, end) = range
                .as_array()
                .filter(|bounds| bounds.len() == 2)
                .map(|bounds| (to_number(&bounds[0]), to_number(&bounds[1])))
                .filter(|(start, end)| start.is_finite() && end.is_finite())
                .ok_or_else(|| {
                    OperationError::InvalidOperation(
                        "loop range must be [start, end] numbers".to_string(),
                    )
                })?;
            // float to int casts saturate
            let len = (end - first).ceil().max(0.0) as usize;
            return Ok(LoopSource::Range { first, len });
        }

        Err(OperationError::InvalidOperation(
            "loop needs items, count or range".to_string(),
        ))
    }

    async fn run_loop(&self, looped: &LoopOp, start: OpStart<'_>, ctx: &LoopContext) -> OpOutcome {
        let span = self.announce(&start);

        let source = match self.loop_source(looped, ctx) {
            Ok(source) => source,
            Err(error) => return self.fail(&start, error),
        };
        let total = source.len();
        let max_iterations = self.config.limits.get_max_iterations();
        self.emit(&LoopStarted {
            index: start.index,
            keyword: start.op.label(),
            iterations: total,
        });

        let mut iterations: Vec<IterationOutcome> = Vec::new();
        let mut loop_error: Option<String> = None;

        for i in 0..total {
            if self.cancel.is_cancelled() {
                loop_error = Some(OperationError::Cancelled.to_string());
                break;
            }
            if i >= max_iterations {
                loop_error = Some(
                    OperationError::InvalidOperation(format!(
                        "loop exceeded the limit of {} iterations",
                        max_iterations
                    ))
                    .to_string(),
                );
                break;
            }

            let item = source.item(i);

            let iteration_ctx = ctx.derive([
                (looped.item_binding().to_string(), item.clone()),
                (looped.index_binding().to_string(), json!(i)),
                ("first".to_string(), json!(i == 0)),
                ("last".to_string(), json!(i + 1 == total)),
                ("length".to_string(), json!(total)),
            ]);
            self.emit(&LoopIteration {
                index: start.index,
                iteration: i,
                total,
            });

            let mut results = Vec::with_capacity(looped.ops.len());
            let mut failed = false;
            for child in &looped.ops {
                let outcome = self
                    .run_op(child, &iteration_ctx)
                    .instrument(span.clone())
                    .await;
                let child_failed = outcome.status.is_error();
                results.push(outcome);
                if child_failed && looped.breaks_on_error() {
                    failed = true;
                    break;
                }
            }
            iterations.push(IterationOutcome {
                iteration: i,
                item,
                results,
            });

            if failed {
                self.loop_stopped(&start, i, "operation failed");
                break;
            }

            if let Some(condition) = &looped.break_if {
                match evaluate_condition(condition, &self.store, &iteration_ctx) {
                    Ok(true) => {
                        self.loop_stopped(&start, i, "breakIf condition met");
                        break;
                    }
                    Ok(false) => {}
                    Err(error) => {
                        loop_error = Some(error.to_string());
                        break;
                    }
                }
            }
            if let Some(condition) = &looped.continue_if {
                match evaluate_condition(condition, &self.store, &iteration_ctx) {
                    Ok(true) => {}
                    Ok(false) => {
                        self.loop_stopped(&start, i, "continueIf condition not met");
                        break;
                    }
                    Err(error) => {
                        loop_error = Some(error.to_string());
                        break;
                    }
                }
            }
        }

        let has_error = loop_error.is_some()
            || iterations
                .iter()
                .any(|iteration| any_error(&iteration.results));
        let output = json!({
            "iterations": iterations.len(),
            "items": total,
            "results": outcomes_value(&iterations),
        });
        self.settle(
            &start,
            status_of(has_error),
            output,
            loop_error,
            OutcomeDetail::Loop {
                iterations: iterations.len(),
                total_items: total,
                iteration_results: iterations,
            },
        )
    }

    fn loop_stopped(&self, start: &OpStart<'_>, iteration: usize, reason: &str) {
        self.emit(&LoopStopped {
            index: start.index,
            iteration,
            reason,
        });
    }

    async fn run_parallel(
        &self,
        parallel: &ParallelOp,
        start: OpStart<'_>,
        ctx: &LoopContext,
    ) -> OpOutcome {
        let span = self.announce(&start);
        let mode = if parallel.race {
            "race"
        } else if parallel.absorbs_failures() {
            "allSettled"
        } else {
            "all"
        };
        self.emit(&ParallelStarted {
            index: start.index,
            count: parallel.ops.len(),
            mode,
        });

        let branches: Vec<BoxFuture<'_, OpOutcome>> = parallel
            .ops
            .iter()
            .map(|child| self.run_op(child, ctx))
            .collect();

        let results = if parallel.race && !branches.is_empty() {
            let (winner, position, _losers) = select_all(branches).instrument(span).await;
            self.emit(&RaceWon {
                index: start.index,
                winner: position,
            });
            vec![winner]
        } else {
            join_all(branches).instrument(span).await
        };

        let failed = any_error(&results) && !parallel.absorbs_failures();
        let output = json!({
            "parallelCount": parallel.ops.len(),
            "completedCount": results.len(),
            "results": outcomes_value(&results),
        });
        self.settle(
            &start,
            status_of(failed),
            output,
            None,
            OutcomeDetail::Parallel {
                parallel_results: results,
            },
        )
    }

    async fn run_try(&self, tried: &TryOp, start: OpStart<'_>, ctx: &LoopContext) -> OpOutcome {
        let span = self.announce(&start);

        let mut try_results = Vec::with_capacity(tried.ops.len());
        let mut caught: Option<String> = None;
        for child in &tried.ops {
            let outcome = self.run_op(child, ctx).instrument(span.clone()).await;
            let failure = outcome
                .status
                .is_error()
                .then(|| outcome.error.clone().unwrap_or_else(|| "Unknown error".into()));
            try_results.push(outcome);
            if let Some(message) = failure {
                self.emit(&TryCaught {
                    index: start.index,
                    error: &message,
                });
                caught = Some(message);
                break;
            }
        }

        let catch_ops = tried.catch.as_deref().unwrap_or(&[]);
        let mut catch_results = Vec::new();
        if let Some(message) = &caught {
            if !catch_ops.is_empty() {
                self.emit(&BlockEntered {
                    index: start.index,
                    block: "catch",
                    ops: catch_ops.len(),
                });
                let catch_ctx = ctx.derive([
                    ("error".to_string(), json!(message)),
                    ("errorMessage".to_string(), json!(message)),
                ]);
                catch_results = self
                    .run_block(catch_ops, &catch_ctx, tried.continue_on_catch_error)
                    .instrument(span.clone())
                    .await;
            }
        }

        let finally_ops = tried.finally.as_deref().unwrap_or(&[]);
        let mut finally_results = Vec::new();
        if !finally_ops.is_empty() {
            self.emit(&BlockEntered {
                index: start.index,
                block: "finally",
                ops: finally_ops.len(),
            });
            finally_results = self
                .run_block(finally_ops, ctx, true)
                .instrument(span)
                .await;
        }

        let unhandled = caught.is_some() && (catch_ops.is_empty() || any_error(&catch_results));
        let output = json!({
            "caught": caught.is_some(),
            "error": caught,
            "tryResults": outcomes_value(&try_results),
            "catchResults": outcomes_value(&catch_results),
            "finallyResults": outcomes_value(&finally_results),
        });
        self.settle(
            &start,
            status_of(unhandled),
            output,
            caught.clone(),
            OutcomeDetail::Try {
                caught: caught.is_some(),
                try_results,
                catch_results,
                finally_results,
            },
        )
    }
}

/// String-encoded loop sources: a JSON array, or comma separated values.
fn split_items(text: &str) -> Vec<Value> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return items;
    }
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',')
        .map(|part| Value::String(part.trim().to_string()))
        .collect()
}
