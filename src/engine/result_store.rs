// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Append-only table of per-operation outcomes.
//!
//! Entries are addressable by execution index and by the optional step id
//! (`opId`). The index counter is advanced when an operation *begins
//! running*, so `{{op.N...}}` always names the Nth operation that actually ran,
//! whatever branches, skips or iteration counts came before it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal state of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpStatus {
    Ok,
    Error,
    Skipped,
}

impl OpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Ok => "OK",
            OpStatus::Error => "ERROR",
            OpStatus::Skipped => "SKIPPED",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OpStatus::Error)
    }
}

impl std::fmt::Display for OpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed outcome. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    pub index: usize,
    pub op_id: Option<String>,
    pub status: OpStatus,
    pub output: Value,
}

impl ResultEntry {
    /// The value templates navigate into: the output object enriched with
    /// `_status` and `_index`. Non-object outputs are exposed as `value`.
    pub fn view(&self) -> Value {
        let mut view = match &self.output {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        view.insert(
            "_status".to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        view.insert("_index".to_string(), Value::from(self.index));
        Value::Object(view)
    }
}

#[derive(Debug, Default)]
struct Entries {
    by_index: BTreeMap<usize, Arc<ResultEntry>>,
    by_id: HashMap<String, Arc<ResultEntry>>,
}

/// Shared by every task of one execution; internally synchronized so that
/// parallel children can commit and read concurrently.
#[derive(Debug, Default)]
pub struct ResultStore {
    next_index: AtomicUsize,
    entries: RwLock<Entries>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next execution index. Call exactly once per operation,
    /// at the moment it begins running.
    pub fn next_index(&self) -> usize {
        self.next_index.fetch_add(1, Ordering::SeqCst)
    }

    /// Commit an outcome. A reused `op_id` is rebound to the newest entry.
    pub fn set(&self, index: usize, op_id: Option<&str>, output: Value, status: OpStatus) {
        let entry = Arc::new(ResultEntry {
            index,
            op_id: op_id.map(str::to_owned),
            status,
            output,
        });
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = op_id {
            entries.by_id.insert(id.to_string(), Arc::clone(&entry));
        }
        entries.by_index.insert(index, entry);
    }

    pub fn get_by_index(&self, index: usize) -> Option<Arc<ResultEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.by_index.get(&index).cloned()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<ResultEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_indices_are_strictly_increasing() {
        let store = ResultStore::new();
        let indices: Vec<usize> = (0..5).map(|_| store.next_index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_lookup_by_index_and_id() {
        let store = ResultStore::new();
        let index = store.next_index();
        store.set(index, Some("a"), json!({"value": 5}), OpStatus::Ok);

        let by_id = store.get_by_id("a").unwrap();
        let by_index = store.get_by_index(index).unwrap();
        assert_eq!(by_id, by_index);
        assert_eq!(
            by_id.view(),
            json!({"value": 5, "_status": "OK", "_index": 0})
        );
        assert!(store.get_by_id("missing").is_none());
        assert!(store.get_by_index(9).is_none());
    }

    #[test]
    fn test_reused_id_rebinds_to_last_writer() {
        let store = ResultStore::new();
        store.set(0, Some("dup"), json!({"n": 1}), OpStatus::Ok);
        store.set(1, Some("dup"), json!({"n": 2}), OpStatus::Error);

        let entry = store.get_by_id("dup").unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(entry.status, OpStatus::Error);
        assert_eq!(store.get_by_index(0).unwrap().output, json!({"n": 1}));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_view_wraps_scalar_outputs() {
        let entry = ResultEntry {
            index: 3,
            op_id: None,
            status: OpStatus::Skipped,
            output: json!("text"),
        };
        assert_eq!(
            entry.view(),
            json!({"value": "text", "_status": "SKIPPED", "_index": 3})
        );
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_value(OpStatus::Skipped).unwrap(), json!("SKIPPED"));
        assert_eq!(OpStatus::Error.to_string(), "ERROR");
    }
}
