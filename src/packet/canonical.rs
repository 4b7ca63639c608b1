// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Canonical serialization, content hashing and the scalar coercions shared by
//! the template resolver, the condition evaluator and the transform driver.
//!
//! Canonical form is compact JSON with object keys sorted lexicographically at
//! every depth. Two values that differ only in key order always produce the
//! same canonical string, so their digests are equal.

use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

/// Canonical JSON text for `value`.
///
/// # Example
/// ```
/// use serde_json::json;
/// use ucp_runner::packet::canonicalize;
///
/// let a = canonicalize(&json!({"b": 1, "a": [true, null]}));
/// let b = canonicalize(&json!({"a": [true, null], "b": 1}));
/// assert_eq!(a, b);
/// assert_eq!(a, r#"{"a":[true,null],"b":1}"#);
/// ```
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Canonical JSON text for any serializable value.
pub fn canonicalize_serialize<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(canonicalize(&serde_json::to_value(value)?))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort explicitly: serde_json may be built with `preserve_order`
            // somewhere in the dependency graph.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&quote(key));
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn quote(s: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// SHA-256 of the UTF-8 bytes of `text`, lowercase hex encoded (64 chars).
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Integral floats print without a fractional part so `5.0` and `5` share a
/// canonical token.
pub fn format_number(n: &Number) -> String {
    if let Some(f) = n.as_f64() {
        if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
            return format!("{}", f as i64);
        }
    }
    n.to_string()
}

/// Build a JSON number from an `f64`, preferring an integer representation.
/// Non-finite results become `null`.
pub fn number_value(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// String form used when splicing a value into text: strings are used raw,
/// everything else is canonicalized.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonicalize(other),
    }
}

/// Numeric coercion with loose-typing semantics: booleans count as 0/1,
/// `null` and the empty string as 0, unparsable text and containers as NaN.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Loose equality: numbers compare against numeric strings and booleans,
/// containers compare structurally, `null` only equals `null`.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(_), Value::Number(_)) => to_number(left) == to_number(right),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => left == right,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            display_value(left) == display_value(right)
        }
        _ => to_number(left) == to_number(right),
    }
}
