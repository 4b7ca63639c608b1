// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::consts::{DEFAULT_DELAY_MS, MIN_POLL_INTERVAL_MS};
use crate::config::loader::WaitConfig;
use crate::drivers::args;
use crate::engine::condition::evaluate_condition_value;
use crate::errors::DriverError;
use crate::traits::{DispatchContext, Driver};

/// `wait.delay` and `wait.until`.
///
/// `until` receives its `condition` unresolved and re-evaluates it against
/// the result store on every poll. Unresolvable templates count as "not yet".
pub struct WaitDriver {
    config: WaitConfig,
}

impl WaitDriver {
    pub fn new(config: WaitConfig) -> Self {
        Self { config }
    }

    async fn delay(&self, args: &Value, cancel: &CancellationToken) -> Result<Value, DriverError> {
        let waited = match args::number(args, "seconds") {
            Some(seconds) if seconds > 0.0 => (seconds * 1000.0).round() as u64,
            _ => args::millis(args, "ms").unwrap_or(DEFAULT_DELAY_MS),
        };
        sleep(Duration::from_millis(waited), cancel).await?;
        Ok(json!({ "waited": waited, "ok": true }))
    }

    async fn until(&self, args: &Value, ctx: DispatchContext<'_>) -> Result<Value, DriverError> {
        let condition = args::require("wait.until", args, "condition")?;
        let timeout_ms = args::millis(args, "timeout")
            .unwrap_or_else(|| self.config.get_until_timeout_ms());
        let interval = Duration::from_millis(
            args::millis(args, "interval")
                .unwrap_or_else(|| self.config.get_poll_interval_ms())
                .max(MIN_POLL_INTERVAL_MS),
        );
        let timeout = Duration::from_millis(timeout_ms);

        let start = Instant::now();
        while start.elapsed() < timeout {
            if evaluate_condition_value(condition, ctx.store, ctx.loop_context).unwrap_or(false) {
                return Ok(json!({
                    "ok": true,
                    "elapsed": start.elapsed().as_millis() as u64,
                }));
            }
            sleep(interval, ctx.cancel).await?;
        }

        Err(DriverError::Timeout {
            operation: "wait.until".into(),
            ms: timeout_ms,
        })
    }
}

async fn sleep(duration: Duration, cancel: &CancellationToken) -> Result<(), DriverError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DriverError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[async_trait]
impl Driver for WaitDriver {
    fn namespace(&self) -> &'static str {
        "wait"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["delay", "until"]
    }

    fn deferred_args(&self, method: &str) -> &'static [&'static str] {
        match method {
            "until" => &["condition"],
            _ => &[],
        }
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        match method {
            "delay" => self.delay(&args, ctx.cancel).await,
            "until" => self.until(&args, ctx).await,
            other => Err(DriverError::UnknownMethod {
                namespace: "wait".into(),
                method: other.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stub::DispatchFixture;
    use crate::engine::result_store::OpStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_delay_prefers_seconds() {
        let fixture = DispatchFixture::new();
        let driver = WaitDriver::new(WaitConfig::default());
        let out = driver
            .call("delay", json!({"ms": 5000, "seconds": 0.01}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(out, json!({"waited": 10, "ok": true}));

        let out = driver.call("delay", json!({"ms": 1}), fixture.ctx()).await.unwrap();
        assert_eq!(out["waited"], json!(1));
    }

    #[tokio::test]
    async fn test_delay_is_cancellable() {
        let fixture = DispatchFixture::new();
        fixture.cancel.cancel();
        let err = WaitDriver::new(WaitConfig::default())
            .call("delay", json!({"ms": 60_000}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::Cancelled);
    }

    #[tokio::test]
    async fn test_until_sees_results_committed_later() {
        let fixture = Arc::new(DispatchFixture::new());
        let writer = fixture.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let index = writer.store.next_index();
            writer
                .store
                .set(index, Some("job"), json!({"done": true}), OpStatus::Ok);
        });

        let out = WaitDriver::new(WaitConfig::default())
            .call(
                "until",
                json!({
                    "condition": {"op": "eq", "left": "{{opId.job.done}}", "right": true},
                    "timeout": 2000,
                    "interval": 5
                }),
                fixture.ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_until_times_out() {
        let fixture = DispatchFixture::new();
        let err = WaitDriver::new(WaitConfig::default())
            .call(
                "until",
                json!({"condition": "1 > 2", "timeout": 30, "interval": 5}),
                fixture.ctx(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "wait.until timeout after 30ms");
    }
}
