// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles for drivers, collaborators and observers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::engine::result_store::ResultStore;
use crate::engine::template::LoopContext;
use crate::engine::tokens::{TokenStats, TokenTracker};
use crate::errors::DriverError;
use crate::traits::{
    DispatchContext, Driver, ExecutionObserver, HttpClient, HttpRequest, HttpResponse, LlmRequest,
    LlmService, LogEntry, LogLevel, Notification, NotificationSink, NotifyOutcome,
};

/// Owns everything a [`DispatchContext`] borrows.
#[derive(Default)]
pub struct DispatchFixture {
    pub cancel: CancellationToken,
    pub store: ResultStore,
    pub loop_context: LoopContext,
    pub tokens: TokenTracker,
}

impl DispatchFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ctx(&self) -> DispatchContext<'_> {
        DispatchContext {
            cancel: &self.cancel,
            store: &self.store,
            loop_context: &self.loop_context,
            tokens: &self.tokens,
        }
    }
}

/// `echo.say` returns its method name and arguments.
pub struct EchoDriver;

#[async_trait]
impl Driver for EchoDriver {
    fn namespace(&self) -> &'static str {
        "echo"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["say"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        _ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        Ok(json!({ "method": method, "args": args }))
    }
}

/// `slow.run` sleeps `ms` then returns `{value}`, or fails with `error`
/// when given one. Honours cancellation while sleeping.
#[derive(Default)]
pub struct SlowDriver {
    calls: AtomicUsize,
}

impl SlowDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for SlowDriver {
    fn namespace(&self) -> &'static str {
        "slow"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["run"]
    }

    async fn call(
        &self,
        _method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(0);
        tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(DriverError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        }
        match args.get("error").and_then(Value::as_str) {
            Some(message) => Err(DriverError::Storage(message.to_string())),
            None => Ok(json!({ "value": args.get("value").cloned().unwrap_or(Value::Null) })),
        }
    }
}

/// `fail.now` always fails with the given `message`.
pub struct FailingDriver;

#[async_trait]
impl Driver for FailingDriver {
    fn namespace(&self) -> &'static str {
        "fail"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["now"]
    }

    async fn call(
        &self,
        _method: &str,
        args: Value,
        _ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        let message = args
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("boom");
        Err(DriverError::Storage(message.to_string()))
    }
}

/// Records requests and answers every one with the same JSON body.
pub struct RecordingHttpClient {
    body: Value,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub fn responding(body: Value) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn request(
        &self,
        request: HttpRequest,
        _cancel: &CancellationToken,
    ) -> Result<HttpResponse, DriverError> {
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            response: self.body.clone(),
            status: 200,
            ok: true,
        })
    }
}

pub struct RecordingNotifier {
    method: Option<&'static str>,
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn working(method: &'static str) -> Self {
        Self {
            method: Some(method),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            method: None,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<NotifyOutcome, DriverError> {
        let method = self
            .method
            .ok_or_else(|| DriverError::Notification("permission denied".into()))?;
        self.shown.lock().unwrap().push(notification.clone());
        Ok(NotifyOutcome {
            shown: true,
            method: method.to_string(),
        })
    }
}

/// Replies to every prompt with a fixed value.
pub struct ScriptedLlm {
    reply: Value,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<Value, DriverError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct CollectingObserver {
    logs: Mutex<Vec<LogEntry>>,
    progress: Mutex<Vec<(usize, usize)>>,
    tokens: Mutex<Vec<TokenStats>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.logs()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn token_updates(&self) -> Vec<TokenStats> {
        self.tokens.lock().unwrap().clone()
    }
}

impl ExecutionObserver for CollectingObserver {
    fn on_log(&self, entry: &LogEntry) {
        self.logs.lock().unwrap().push(entry.clone());
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.progress.lock().unwrap().push((completed, total));
    }

    fn on_token_update(&self, stats: &TokenStats) {
        self.tokens.lock().unwrap().push(stats.clone());
    }
}
