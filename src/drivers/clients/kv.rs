// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::DriverError;
use crate::packet::canonical::{number_value, to_number};
use crate::traits::KeyValueStore;

/// In-process [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn put(&self, key: &str, value: Value) -> Result<(), DriverError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, DriverError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, DriverError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn increment(&self, key: &str, by: f64) -> Result<(f64, f64), DriverError> {
        let mut entries = self.entries.write().await;
        let previous = entries
            .get(key)
            .map(to_number)
            .filter(|n| n.is_finite())
            .unwrap_or(0.0);
        let current = previous + by;
        entries.insert(key.to_string(), number_value(current));
        Ok((previous, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryKvStore::new();
        store.put("a", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_increment_treats_garbage_as_zero() {
        let store = MemoryKvStore::new();
        store.put("n", json!("abc")).await.unwrap();
        assert_eq!(store.increment("n", 2.0).await.unwrap(), (0.0, 2.0));
        store.put("m", json!("40")).await.unwrap();
        assert_eq!(store.increment("m", 2.0).await.unwrap(), (40.0, 42.0));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_atomic() {
        let store = Arc::new(MemoryKvStore::new());
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("hits", 1.0).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.get("hits").await.unwrap(), Some(json!(20)));
    }
}
