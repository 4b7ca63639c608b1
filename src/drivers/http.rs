// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::loader::HttpConfig;
use crate::drivers::args;
use crate::errors::DriverError;
use crate::observability::messages::driver::HttpRequestSent;
use crate::observability::messages::StructuredLog;
use crate::packet::canonical::display_value;
use crate::traits::{DispatchContext, Driver, HttpClient, HttpMethod, HttpRequest};

const JSON_CONTENT_TYPE: &str = "application/json";

/// `http.get|post|put|delete` over an [`HttpClient`].
///
/// Arguments: `url`, `headers`, `timeout` (ms), and for post/put a `json`
/// or `body` payload.
pub struct HttpDriver {
    client: Arc<dyn HttpClient>,
    config: HttpConfig,
}

impl HttpDriver {
    pub fn new(client: Arc<dyn HttpClient>, config: HttpConfig) -> Self {
        Self { client, config }
    }

    fn build_request(&self, method: HttpMethod, args: &Value) -> Result<HttpRequest, DriverError> {
        let op = format!("http.{}", method.as_str().to_lowercase());
        let url = args::require_text(&op, args, "url")?;

        let mut headers = BTreeMap::new();
        set_header(&mut headers, "Accept", JSON_CONTENT_TYPE);
        if method.has_body() {
            set_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
        }
        for (name, value) in &self.config.default_headers {
            set_header(&mut headers, name, value);
        }
        if let Some(caller) = args::arg(args, "headers") {
            let caller = caller
                .as_object()
                .ok_or_else(|| DriverError::invalid_args(&op, "headers must be an object"))?;
            for (name, value) in caller {
                set_header(&mut headers, name, &display_value(value));
            }
        }

        let body = if method.has_body() {
            args::arg(args, "json")
                .or_else(|| args::arg(args, "body"))
                .cloned()
        } else {
            None
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: self.config.validate_and_clamp(args::millis(args, "timeout")),
        })
    }
}

/// Header names compare case-insensitively; the later spelling wins.
fn set_header(headers: &mut BTreeMap<String, String>, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

#[async_trait]
impl Driver for HttpDriver {
    fn namespace(&self) -> &'static str {
        "http"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["get", "post", "put", "delete"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        let method = match method {
            "get" => HttpMethod::Get,
            "post" => HttpMethod::Post,
            "put" => HttpMethod::Put,
            "delete" => HttpMethod::Delete,
            other => {
                return Err(DriverError::UnknownMethod {
                    namespace: "http".into(),
                    method: other.into(),
                })
            }
        };

        let request = self.build_request(method, &args)?;
        let url = request.url.clone();
        let start = Instant::now();
        let response = self.client.request(request, ctx.cancel).await?;

        HttpRequestSent {
            method: method.as_str(),
            url: &url,
            status: response.status,
            duration: start.elapsed(),
        }
        .log();

        serde_json::to_value(response).map_err(|e| DriverError::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stub::{DispatchFixture, RecordingHttpClient};
    use serde_json::json;
    use std::time::Duration;

    fn driver(client: Arc<RecordingHttpClient>, config: HttpConfig) -> HttpDriver {
        HttpDriver::new(client, config)
    }

    #[tokio::test]
    async fn test_get_sends_accept_only() {
        let client = Arc::new(RecordingHttpClient::responding(json!({"ok": 1})));
        let fixture = DispatchFixture::new();
        let out = driver(client.clone(), HttpConfig::default())
            .call("get", json!({"url": "http://x.test/a"}), fixture.ctx())
            .await
            .unwrap();

        assert_eq!(out, json!({"response": {"ok": 1}, "status": 200, "ok": true}));
        let sent = client.last_request().unwrap();
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.headers.get("Accept").map(String::as_str), Some(JSON_CONTENT_TYPE));
        assert!(!sent.headers.contains_key("Content-Type"));
        assert_eq!(sent.body, None);
        assert_eq!(sent.timeout, Duration::from_millis(15_000));
    }

    #[tokio::test]
    async fn test_post_merges_headers_and_prefers_json_body() {
        let client = Arc::new(RecordingHttpClient::responding(json!("created")));
        let fixture = DispatchFixture::new();
        let mut config = HttpConfig::default();
        config
            .default_headers
            .insert("X-Client".into(), "ucp".into());
        config
            .default_headers
            .insert("accept".into(), "text/plain".into());

        driver(client.clone(), config)
            .call(
                "post",
                json!({
                    "url": "http://x.test/items",
                    "json": {"name": "a"},
                    "body": "ignored",
                    "headers": {"content-type": "application/vnd.api+json", "X-Retry": 2},
                    "timeout": 500
                }),
                fixture.ctx(),
            )
            .await
            .unwrap();

        let sent = client.last_request().unwrap();
        assert_eq!(sent.body, Some(json!({"name": "a"})));
        assert_eq!(sent.timeout, Duration::from_millis(500));
        assert_eq!(
            sent.headers,
            BTreeMap::from([
                ("X-Client".to_string(), "ucp".to_string()),
                ("X-Retry".to_string(), "2".to_string()),
                ("accept".to_string(), "text/plain".to_string()),
                (
                    "content-type".to_string(),
                    "application/vnd.api+json".to_string()
                ),
            ])
        );
    }

    #[tokio::test]
    async fn test_timeout_is_clamped() {
        let client = Arc::new(RecordingHttpClient::responding(json!(null)));
        let fixture = DispatchFixture::new();
        driver(client.clone(), HttpConfig::default())
            .call(
                "delete",
                json!({"url": "http://x.test/a", "timeout": 10_000_000}),
                fixture.ctx(),
            )
            .await
            .unwrap();
        assert_eq!(
            client.last_request().unwrap().timeout,
            Duration::from_millis(crate::config::consts::MAX_HTTP_TIMEOUT_MS)
        );
    }

    #[tokio::test]
    async fn test_missing_url_is_invalid_args() {
        let client = Arc::new(RecordingHttpClient::responding(json!(null)));
        let fixture = DispatchFixture::new();
        let err = driver(client, HttpConfig::default())
            .call("get", json!({}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "http.get: missing 'url'");
    }
}
