// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::engine::result_store::ResultStore;
use crate::engine::template::LoopContext;
use crate::engine::tokens::TokenTracker;
use crate::errors::DriverError;

/// Per-dispatch view of the run a driver call belongs to.
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Shared cancellation signal for the whole run
    pub cancel: &'a CancellationToken,
    /// Committed results, for drivers that poll (`wait.until`)
    pub store: &'a ResultStore,
    /// Loop bindings of the calling operation
    pub loop_context: &'a LoopContext,
    /// Token accounting for LLM calls
    pub tokens: &'a TokenTracker,
}

/// A capability adapter addressed by `namespace.method`.
#[async_trait]
pub trait Driver: Send + Sync {
    fn namespace(&self) -> &'static str;

    fn methods(&self) -> &'static [&'static str];

    /// Argument keys that must reach the driver unresolved.
    fn deferred_args(&self, _method: &str) -> &'static [&'static str] {
        &[]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError>;
}
