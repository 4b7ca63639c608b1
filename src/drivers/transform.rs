// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pure data shaping. No I/O; outputs depend only on the arguments.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::drivers::args;
use crate::engine::template::get_path;
use crate::errors::DriverError;
use crate::packet::canonical::{canonicalize, display_value, is_truthy, loose_eq, number_value, to_number};
use crate::traits::{DispatchContext, Driver};

/// `transform.map|filter|reduce|set|concat|split|json`.
pub struct TransformDriver;

/// `None` when the field is absent, which compares as NaN numerically.
fn field_of<'a>(item: &'a Value, field: Option<&str>) -> Option<&'a Value> {
    match field {
        Some(path) => get_path(item, path),
        None => Some(item),
    }
}

fn numeric(value: Option<&Value>) -> f64 {
    value.map(to_number).unwrap_or(f64::NAN)
}

fn joined(values: &[Value], separator: &str) -> String {
    values
        .iter()
        .map(|value| match value {
            Value::Null => String::new(),
            other => display_value(other),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn map(args: &Value) -> Result<Value, DriverError> {
    let items = args::array("transform.map", args, "items")?;
    let expression = args::arg(args, "expression").and_then(Value::as_str);
    let mapped: Vec<Value> = items
        .iter()
        .map(|item| match expression {
            Some(path) => get_path(item, path)
                .filter(|value| !value.is_null())
                .unwrap_or(item)
                .clone(),
            None => item.clone(),
        })
        .collect();
    Ok(json!({ "count": mapped.len(), "items": mapped }))
}

fn filter(args: &Value) -> Result<Value, DriverError> {
    let items = args::array("transform.filter", args, "items")?;
    let field = args::arg(args, "field").and_then(Value::as_str);
    let op = args::text_or(args, "op", "exists");
    let expected = args.get("value").unwrap_or(&Value::Null);

    let kept: Vec<Value> = items
        .iter()
        .filter(|item| {
            let actual = field_of(item, field);
            let loose = actual.unwrap_or(&Value::Null);
            match op.as_str() {
                "eq" | "==" => loose_eq(loose, expected),
                "neq" | "!=" => !loose_eq(loose, expected),
                "gt" => numeric(actual) > to_number(expected),
                "gte" => numeric(actual) >= to_number(expected),
                "lt" => numeric(actual) < to_number(expected),
                "lte" => numeric(actual) <= to_number(expected),
                "contains" => display_value(loose).contains(&display_value(expected)),
                _ => is_truthy(loose),
            }
        })
        .cloned()
        .collect();
    Ok(json!({ "count": kept.len(), "items": kept }))
}

fn reduce(args: &Value) -> Result<Value, DriverError> {
    let items = args::array("transform.reduce", args, "items")?;
    let field = args::arg(args, "field").and_then(Value::as_str);
    let values: Vec<Value> = items
        .iter()
        .map(|item| field_of(item, field).cloned().unwrap_or(Value::Null))
        .collect();
    let numbers: Vec<f64> = values.iter().map(to_number).collect();

    let result = match args::text_or(args, "op", "sum").as_str() {
        "sum" => {
            let initial = args::arg(args, "initial").map(to_number).unwrap_or(0.0);
            number_value(numbers.iter().fold(initial, |acc, n| acc + n))
        }
        "avg" => number_value(numbers.iter().sum::<f64>() / values.len() as f64),
        "min" => number_value(numbers.iter().fold(f64::INFINITY, |a, &b| a.min_nan(b))),
        "max" => number_value(numbers.iter().fold(f64::NEG_INFINITY, |a, &b| a.max_nan(b))),
        "concat" => Value::String(joined(&values, &args::text_or(args, "separator", ""))),
        "first" => values.first().cloned().unwrap_or(Value::Null),
        "last" => values.last().cloned().unwrap_or(Value::Null),
        _ => json!(values.len()),
    };
    Ok(json!({ "result": result, "count": items.len() }))
}

/// `min`/`max` that propagate NaN like the loose numeric model expects.
trait NanAware {
    fn min_nan(self, other: f64) -> f64;
    fn max_nan(self, other: f64) -> f64;
}

impl NanAware for f64 {
    fn min_nan(self, other: f64) -> f64 {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else {
            self.min(other)
        }
    }

    fn max_nan(self, other: f64) -> f64 {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else {
            self.max(other)
        }
    }
}

fn set(args: &Value) -> Value {
    let mut rest: Map<String, Value> = args.as_object().cloned().unwrap_or_default();
    let value = rest.remove("value");
    let merge = rest.remove("merge");

    let mut out = match merge {
        Some(Value::Object(base)) => {
            let mut base = base;
            base.extend(rest);
            base
        }
        _ => rest,
    };
    if let Some(value) = value {
        out.insert("value".into(), value);
    }
    Value::Object(out)
}

fn concat(args: &Value) -> Value {
    let separator = args::text_or(args, "separator", "");
    match args.get("items") {
        Some(Value::Array(items)) => json!({ "result": joined(items, &separator) }),
        Some(other) => json!({ "result": display_value(other) }),
        None => json!({ "result": "" }),
    }
}

fn split(args: &Value) -> Result<Value, DriverError> {
    let text = args::require_text("transform.split", args, "value")?;
    let separator = args::text_or(args, "separator", ",");
    let parts: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator.as_str()).map(String::from).collect()
    };
    Ok(json!({ "count": parts.len(), "items": parts }))
}

fn json_codec(args: &Value) -> Result<Value, DriverError> {
    let value = args.get("value").unwrap_or(&Value::Null);
    match value {
        Value::String(text) if args::flag(args, "parse") => serde_json::from_str::<Value>(text)
            .map(|parsed| json!({ "result": parsed }))
            .map_err(|e| DriverError::invalid_args("transform.json", e.to_string())),
        other => Ok(json!({ "result": canonicalize(other) })),
    }
}

#[async_trait]
impl Driver for TransformDriver {
    fn namespace(&self) -> &'static str {
        "transform"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["map", "filter", "reduce", "set", "concat", "split", "json"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        _ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        match method {
            "map" => map(&args),
            "filter" => filter(&args),
            "reduce" => reduce(&args),
            "set" => Ok(set(&args)),
            "concat" => Ok(concat(&args)),
            "split" => split(&args),
            "json" => json_codec(&args),
            other => Err(DriverError::UnknownMethod {
                namespace: "transform".into(),
                method: other.into(),
            }),
        }
    }
}
