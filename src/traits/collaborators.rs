// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Contracts for the external services drivers delegate to.
//!
//! Concrete implementations live in `drivers::clients`; tests substitute
//! their own.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether the request carries a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Final headers: defaults already merged under the caller's.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Non-2xx responses are data (`ok: false`), not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Parsed JSON for JSON content types, text otherwise
    pub response: Value,
    pub status: u16,
    pub ok: bool,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform the request, honouring `request.timeout` and `cancel`.
    async fn request(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, DriverError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: Value) -> Result<(), DriverError>;

    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, DriverError>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, DriverError>;

    /// Atomically add `by`, treating missing or non-numeric values as 0.
    /// Returns `(previous, current)`.
    async fn increment(&self, key: &str, by: f64) -> Result<(f64, f64), DriverError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyOutcome {
    pub shown: bool,
    /// Channel that delivered the notification
    pub method: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Fails with `DriverError::Notification` when the channel is unavailable.
    async fn show(&self, notification: &Notification) -> Result<NotifyOutcome, DriverError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default)]
    pub web_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Opaque prompt invocation. The engine only measures text length.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn invoke(&self, request: LlmRequest) -> Result<Value, DriverError>;
}
