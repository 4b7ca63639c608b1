// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::drivers::args;
use crate::errors::DriverError;
use crate::observability::messages::driver::{NotificationFallback, NotificationShown};
use crate::observability::messages::StructuredLog;
use crate::traits::{DispatchContext, Driver, Notification, NotificationSink};

/// `notify.show` with a primary channel and a fallback.
///
/// When no primary sink is configured, or it fails, the notification goes to
/// the fallback sink.
pub struct NotifyDriver {
    primary: Option<Arc<dyn NotificationSink>>,
    fallback: Arc<dyn NotificationSink>,
}

impl NotifyDriver {
    pub fn new(
        primary: Option<Arc<dyn NotificationSink>>,
        fallback: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { primary, fallback }
    }

    async fn show(&self, args: &Value) -> Result<Value, DriverError> {
        let notification = Notification {
            title: args::require_text("notify.show", args, "title")?,
            body: args::arg(args, "body").map(crate::packet::canonical::display_value),
            icon: args::arg(args, "icon").map(crate::packet::canonical::display_value),
        };

        let outcome = match &self.primary {
            Some(primary) => match primary.show(&notification).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    NotificationFallback {
                        title: &notification.title,
                        error: &error,
                    }
                    .log();
                    self.fallback.show(&notification).await?
                }
            },
            None => self.fallback.show(&notification).await?,
        };

        NotificationShown {
            title: &notification.title,
            body: notification.body.as_deref().unwrap_or(""),
            method: &outcome.method,
        }
        .log();

        serde_json::to_value(outcome).map_err(|e| DriverError::Notification(e.to_string()))
    }
}

#[async_trait]
impl Driver for NotifyDriver {
    fn namespace(&self) -> &'static str {
        "notify"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["show"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        _ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        match method {
            "show" => self.show(&args).await,
            other => Err(DriverError::UnknownMethod {
                namespace: "notify".into(),
                method: other.into(),
            }),
        }
    }
}
