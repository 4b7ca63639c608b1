// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::DriverError;
use crate::traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, DriverError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };
        let timeout_ms = request.timeout.as_millis() as u64;
        let label = format!("{} {}", request.method.as_str(), request.url);

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| DriverError::Http(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                DriverError::Timeout {
                    operation: label.clone(),
                    ms: timeout_ms,
                }
            } else {
                DriverError::Http(e.to_string())
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(map_err)?;

        let body = if !is_json {
            Value::String(text)
        } else if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| DriverError::Http(format!("invalid JSON response: {}", e)))?
        };

        Ok(HttpResponse {
            response: body,
            status: status.as_u16(),
            ok: status.is_success(),
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, DriverError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(DriverError::Cancelled),
            response = self.exchange(request) => response,
        }
    }
}
