// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::drivers::args;
use crate::errors::DriverError;
use crate::packet::canonical::number_value;
use crate::traits::{DispatchContext, Driver, KeyValueStore};

/// `local.put|get|delete|increment` against a [`KeyValueStore`].
pub struct LocalDriver {
    store: Arc<dyn KeyValueStore>,
}

impl LocalDriver {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn put(&self, args: &Value) -> Result<Value, DriverError> {
        let key = args::require_text("local.put", args, "key")?;
        let value = args.get("value").cloned().unwrap_or(Value::Null);
        self.store.put(&key, value).await?;
        Ok(json!({ "ok": true, "key": key }))
    }

    async fn get(&self, args: &Value) -> Result<Value, DriverError> {
        let key = args::require_text("local.get", args, "key")?;
        match self.store.get(&key).await? {
            Some(value) => Ok(json!({ "value": decode_stored(value), "key": key })),
            None => match args.get("default") {
                Some(default) => Ok(json!({ "value": default, "key": key, "default": true })),
                None => Err(DriverError::KeyNotFound(key)),
            },
        }
    }

    async fn delete(&self, args: &Value) -> Result<Value, DriverError> {
        let key = args::require_text("local.delete", args, "key")?;
        self.store.delete(&key).await?;
        Ok(json!({ "ok": true, "key": key, "deleted": true }))
    }

    async fn increment(&self, args: &Value) -> Result<Value, DriverError> {
        let key = args::require_text("local.increment", args, "key")?;
        let by = args::number(args, "by").unwrap_or(1.0);
        let (previous, current) = self.store.increment(&key, by).await?;
        Ok(json!({
            "ok": true,
            "key": key,
            "value": number_value(current),
            "previous": number_value(previous),
        }))
    }
}

/// Values written as JSON text come back structured.
fn decode_stored(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[async_trait]
impl Driver for LocalDriver {
    fn namespace(&self) -> &'static str {
        "local"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["put", "get", "delete", "increment"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        _ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        match method {
            "put" => self.put(&args).await,
            "get" => self.get(&args).await,
            "delete" => self.delete(&args).await,
            "increment" => self.increment(&args).await,
            other => Err(DriverError::UnknownMethod {
                namespace: "local".into(),
                method: other.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::clients::MemoryKvStore;
    use crate::drivers::stub::DispatchFixture;

    fn driver() -> LocalDriver {
        LocalDriver::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let fixture = DispatchFixture::new();
        let local = driver();
        let out = local
            .call("put", json!({"key": "k", "value": {"a": [1]}}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true, "key": "k"}));

        let out = local.call("get", json!({"key": "k"}), fixture.ctx()).await.unwrap();
        assert_eq!(out, json!({"value": {"a": [1]}, "key": "k"}));
    }

    #[tokio::test]
    async fn test_get_parses_json_text() {
        let fixture = DispatchFixture::new();
        let local = driver();
        local
            .call("put", json!({"key": "k", "value": "[1,2]"}), fixture.ctx())
            .await
            .unwrap();
        let out = local.call("get", json!({"key": "k"}), fixture.ctx()).await.unwrap();
        assert_eq!(out["value"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_missing_key_uses_default_or_fails() {
        let fixture = DispatchFixture::new();
        let local = driver();
        let out = local
            .call("get", json!({"key": "nope", "default": 0}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(out, json!({"value": 0, "key": "nope", "default": true}));

        let err = local
            .call("get", json!({"key": "nope"}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::KeyNotFound("nope".into()));
    }

    #[tokio::test]
    async fn test_increment_and_delete() {
        let fixture = DispatchFixture::new();
        let local = driver();
        let first = local
            .call("increment", json!({"key": "hits"}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(first, json!({"ok": true, "key": "hits", "value": 1, "previous": 0}));

        let second = local
            .call("increment", json!({"key": "hits", "by": 5}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(second["value"], json!(6));
        assert_eq!(second["previous"], json!(1));

        let out = local
            .call("delete", json!({"key": "hits"}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(out["deleted"], json!(true));
        assert!(local.call("get", json!({"key": "hits"}), fixture.ctx()).await.is_err());
    }
}
