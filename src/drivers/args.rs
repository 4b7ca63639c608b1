// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Accessors for resolved driver arguments.

use serde_json::Value;

use crate::errors::DriverError;
use crate::packet::canonical::{display_value, to_number};

/// Present and not `null`.
pub fn arg<'a>(args: &'a Value, key: &str) -> Option<&'a Value> {
    args.get(key).filter(|value| !value.is_null())
}

pub fn require<'a>(op: &str, args: &'a Value, key: &str) -> Result<&'a Value, DriverError> {
    arg(args, key).ok_or_else(|| DriverError::invalid_args(op, format!("missing '{}'", key)))
}

/// A string argument; scalars are rendered as text.
pub fn require_text(op: &str, args: &Value, key: &str) -> Result<String, DriverError> {
    require(op, args, key).map(display_value)
}

pub fn text_or(args: &Value, key: &str, default: &str) -> String {
    arg(args, key)
        .map(display_value)
        .unwrap_or_else(|| default.to_string())
}

pub fn number(args: &Value, key: &str) -> Option<f64> {
    arg(args, key).map(to_number).filter(|n| n.is_finite())
}

/// Non-negative whole milliseconds.
pub fn millis(args: &Value, key: &str) -> Option<u64> {
    number(args, key).map(|n| n.max(0.0).round() as u64)
}

pub fn flag(args: &Value, key: &str) -> bool {
    arg(args, key)
        .map(crate::packet::canonical::is_truthy)
        .unwrap_or(false)
}

pub fn array<'a>(op: &str, args: &'a Value, key: &str) -> Result<&'a Vec<Value>, DriverError> {
    arg(args, key)
        .and_then(Value::as_array)
        .ok_or_else(|| DriverError::invalid_args(op, format!("requires {} to be an array", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_counts_as_missing() {
        let args = json!({"a": null, "b": 2});
        assert!(arg(&args, "a").is_none());
        assert!(require("x.y", &args, "a").is_err());
        assert_eq!(require_text("x.y", &args, "b").unwrap(), "2");
    }

    #[test]
    fn test_numeric_coercions() {
        let args = json!({"ms": "250", "bad": "soon", "neg": -5});
        assert_eq!(millis(&args, "ms"), Some(250));
        assert_eq!(millis(&args, "bad"), None);
        assert_eq!(millis(&args, "neg"), Some(0));
    }

    #[test]
    fn test_array_error_names_the_operation() {
        let err = array("transform.map", &json!({"items": "x"}), "items").unwrap_err();
        assert_eq!(
            err.to_string(),
            "transform.map: requires items to be an array"
        );
    }
}
