// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::DriverError;
use crate::traits::{Notification, NotificationSink, NotifyOutcome};

/// Writes notifications to the log. Never fails, so it serves as the
/// fallback channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn show(&self, notification: &Notification) -> Result<NotifyOutcome, DriverError> {
        tracing::info!(
            title = %notification.title,
            body = notification.body.as_deref().unwrap_or(""),
            icon = notification.icon.as_deref().unwrap_or(""),
            "notification"
        );
        Ok(NotifyOutcome {
            shown: true,
            method: "log".into(),
        })
    }
}
