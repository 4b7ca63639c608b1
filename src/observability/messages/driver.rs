// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for driver dispatch and collaborator calls.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::traits::observer::LogLevel;

/// A standard operation was routed to its driver.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct DriverDispatched<'a> {
    pub namespace: &'a str,
    pub method: &'a str,
}

impl Display for DriverDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dispatching {}.{}", self.namespace, self.method)
    }
}

impl StructuredLog for DriverDispatched<'_> {
    fn log(&self) {
        tracing::debug!(namespace = self.namespace, method = self.method, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "driver",
            span_name = name,
            namespace = self.namespace,
            method = self.method,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

/// An HTTP exchange completed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ucp_runner::observability::messages::driver::HttpRequestSent;
///
/// let msg = HttpRequestSent {
///     method: "GET",
///     url: "https://example.test/items",
///     status: 200,
///     duration: Duration::from_millis(12),
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "GET https://example.test/items -> 200 (12ms)"
/// );
/// ```
pub struct HttpRequestSent<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub status: u16,
    pub duration: Duration,
}

impl Display for HttpRequestSent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {} ({}ms)",
            self.method,
            self.url,
            self.status,
            self.duration.as_millis()
        )
    }
}

impl StructuredLog for HttpRequestSent<'_> {
    fn log(&self) {
        tracing::info!(
            method = self.method,
            url = self.url,
            status = self.status,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "http_request",
            span_name = name,
            method = self.method,
            url = self.url,
        )
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// The primary notification sink failed and the fallback is used.
///
/// # Log Level
/// `warn!` - Degraded operation
pub struct NotificationFallback<'a> {
    pub title: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for NotificationFallback<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Notification '{}' failed ({}), using fallback",
            self.title, self.error
        )
    }
}

impl StructuredLog for NotificationFallback<'_> {
    fn log(&self) {
        tracing::warn!(title = self.title, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("notification_fallback", span_name = name, title = self.title)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Warning
    }
}

/// A notification reached a sink.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NotificationShown<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub method: &'a str,
}

impl Display for NotificationShown<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.method, self.title, self.body)
    }
}

impl StructuredLog for NotificationShown<'_> {
    fn log(&self) {
        tracing::info!(
            title = self.title,
            body = self.body,
            method = self.method,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("notification", span_name = name, method = self.method)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Token estimate recorded for a language-model call.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct LlmTokensEstimated<'a> {
    pub method: &'a str,
    pub input: u64,
    pub output: u64,
    pub saved: u64,
}

impl Display for LlmTokensEstimated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "llm.{} used ~{} input and ~{} output tokens ({} saved)",
            self.method, self.input, self.output, self.saved
        )
    }
}

impl StructuredLog for LlmTokensEstimated<'_> {
    fn log(&self) {
        tracing::debug!(
            method = self.method,
            input_tokens = self.input,
            output_tokens = self.output,
            saved_tokens = self.saved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("llm_tokens", span_name = name, method = self.method)
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }
}
