// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Condition evaluation for `skipIf`, `runIf`, `condition`, `breakIf`,
//! `continueIf` and `wait.until`.
//!
//! String conditions are template-resolved and then evaluated by the
//! expression language; malformed expressions evaluate to `false`.
//! Structured conditions compare resolved operands. Unresolvable templates
//! are reported as errors so the owning operation can fail.

use regex::Regex;
use serde_json::Value;

use crate::engine::expression::{evaluate_expression, strict_eq};
use crate::engine::result_store::ResultStore;
use crate::engine::template::{get_path, resolve, resolve_str, LoopContext};
use crate::errors::ResolutionError;
use crate::packet::canonical::{display_value, is_truthy, loose_eq, to_number};
use crate::packet::{Condition, StructuredCondition};

/// Evaluate `condition` against the committed results and loop context.
pub fn evaluate_condition(
    condition: &Condition,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<bool, ResolutionError> {
    match condition {
        Condition::Expression(text) => match resolve_str(text, store, context)? {
            Value::String(resolved) => Ok(evaluate_expression(&resolved).unwrap_or(false)),
            other => Ok(is_truthy(&other)),
        },
        Condition::Structured(structured) => evaluate_structured(structured, store, context),
        Condition::Literal(value) => Ok(is_truthy(value)),
    }
}

/// Evaluate a raw JSON condition (as found in driver arguments).
pub fn evaluate_condition_value(
    condition: &Value,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<bool, ResolutionError> {
    evaluate_condition(&Condition::from(condition.clone()), store, context)
}

fn evaluate_structured(
    condition: &StructuredCondition,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<bool, ResolutionError> {
    let sub = |value: Option<&Value>| -> Result<bool, ResolutionError> {
        match value {
            Some(value) => evaluate_condition_value(value, store, context),
            None => Ok(false),
        }
    };

    match condition.op.as_str() {
        "and" | "&&" => return Ok(sub(condition.left.as_ref())? && sub(condition.right.as_ref())?),
        "or" | "||" => return Ok(sub(condition.left.as_ref())? || sub(condition.right.as_ref())?),
        "not" | "!" => {
            return Ok(!sub(condition.value.as_ref().or(condition.left.as_ref()))?);
        }
        _ => {}
    }

    let operand = |value: &Option<Value>| -> Result<Option<Value>, ResolutionError> {
        value
            .as_ref()
            .map(|v| resolve(v, store, context).map(parse_structured_literal))
            .transpose()
    };
    let mut left = operand(&condition.left)?;
    let right = operand(&condition.right)?;
    let check = operand(&condition.value)?;

    if let Some(field) = condition.field.as_deref() {
        if let Some(target @ (Value::Object(_) | Value::Array(_))) = &left {
            left = get_path(target, field).cloned();
        }
    }

    let result = match condition.op.as_str() {
        "eq" | "==" | "equals" => loose_eq(&or_null(&left), &or_null(&right)),
        "neq" | "!=" | "notEquals" => !loose_eq(&or_null(&left), &or_null(&right)),
        "gt" | ">" => number(&left) > number(&right),
        "gte" | ">=" => number(&left) >= number(&right),
        "lt" | "<" => number(&left) < number(&right),
        "lte" | "<=" => number(&left) <= number(&right),
        "contains" => text(&left).contains(&text(&right)),
        "startsWith" => text(&left).starts_with(&text(&right)),
        "endsWith" => text(&left).ends_with(&text(&right)),
        "matches" => Regex::new(&text(&right))
            .map(|pattern| pattern.is_match(&text(&left)))
            .unwrap_or(false),
        "exists" | "truthy" => check.or(left).as_ref().map(is_truthy).unwrap_or(false),
        "empty" => is_empty(check.or(left).as_ref()),
        "in" => match (&left, &right) {
            (Some(needle), Some(Value::Array(haystack))) => {
                haystack.iter().any(|item| strict_eq(item, needle))
            }
            _ => false,
        },
        "status" => {
            let recorded = left.as_ref().and_then(|reference| {
                let by_id = match reference {
                    Value::String(id) => store.get_by_id(id),
                    _ => None,
                };
                by_id.or_else(|| {
                    let index = to_number(reference);
                    (index.is_finite() && index >= 0.0 && index.fract() == 0.0)
                        .then(|| store.get_by_index(index as usize))
                        .flatten()
                })
            });
            match (recorded, &right) {
                (Some(entry), Some(expected)) => entry.status.as_str() == display_value(expected),
                _ => false,
            }
        }
        _ => true,
    };
    Ok(result)
}

/// Operands that look like object or array literals are parsed as JSON.
fn parse_structured_literal(value: Value) -> Value {
    match &value {
        Value::String(s) if s.starts_with('{') || s.starts_with('[') => {
            serde_json::from_str(s).unwrap_or(value)
        }
        _ => value,
    }
}

fn or_null(value: &Option<Value>) -> Value {
    value.clone().unwrap_or(Value::Null)
}

fn number(value: &Option<Value>) -> f64 {
    value.as_ref().map(to_number).unwrap_or(f64::NAN)
}

fn text(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map(display_value)
        .unwrap_or_else(|| "undefined".to_string())
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result_store::OpStatus;
    use serde_json::json;

    fn store() -> ResultStore {
        let store = ResultStore::new();
        store.set(
            store.next_index(),
            Some("a"),
            json!({"value": 5, "name": "Ada Lovelace", "tags": ["x"], "user": {"age": 36}}),
            OpStatus::Ok,
        );
        store.set(store.next_index(), Some("b"), json!({"error": "boom"}), OpStatus::Error);
        store
    }

    fn eval(condition: Value) -> Result<bool, ResolutionError> {
        evaluate_condition_value(&condition, &store(), &LoopContext::new())
    }

    #[test]
    fn test_structured_operators() {
        let cases = vec![
            (json!({"op": "gt", "left": "{{opId.a.value}}", "right": 10}), false),
            (json!({"op": "lte", "left": "{{opId.a.value}}", "right": "5"}), true),
            (json!({"op": "eq", "left": "{{opId.a.value}}", "right": "5"}), true),
            (json!({"op": "equals", "left": "x", "right": "x"}), true),
            (json!({"op": "!=", "left": 1, "right": 2}), true),
            (json!({"op": "contains", "left": "{{opId.a.name}}", "right": "Love"}), true),
            (json!({"op": "startsWith", "left": "{{opId.a.name}}", "right": "Ada"}), true),
            (json!({"op": "endsWith", "left": "{{opId.a.name}}", "right": "Ada"}), false),
            (json!({"op": "matches", "left": "{{opId.a.name}}", "right": "^A.a\\s"}), true),
            (json!({"op": "matches", "left": "x", "right": "("}), false),
            (json!({"op": "exists", "value": "{{opId.a.tags}}"}), true),
            (json!({"op": "truthy", "left": 0}), false),
            (json!({"op": "empty", "value": []}), true),
            (json!({"op": "empty", "value": "{}"}), true),
            (json!({"op": "empty", "left": "x"}), false),
            (json!({"op": "in", "left": "x", "right": "{{opId.a.tags}}"}), true),
            (json!({"op": "in", "left": 1, "right": "[\"1\"]"}), false),
            (json!({"op": "gt", "left": "{{opId.a.user}}", "field": "age", "right": 30}), true),
            (json!({"op": "status", "left": "b", "right": "ERROR"}), true),
            (json!({"op": "status", "left": 0, "right": "OK"}), true),
            (json!({"op": "status", "left": "nope", "right": "OK"}), false),
            (json!({"op": "mystery"}), true),
        ];
        for (condition, expected) in cases {
            assert_eq!(eval(condition.clone()), Ok(expected), "{}", condition);
        }
    }

    #[test]
    fn test_boolean_composition() {
        let both = json!({
            "op": "and",
            "left": {"op": "gt", "left": "{{opId.a.value}}", "right": 1},
            "right": "{{opId.a.value}} < 10"
        });
        assert_eq!(eval(both), Ok(true));

        let either = json!({"op": "||", "left": false, "right": {"op": "not", "value": false}});
        assert_eq!(eval(either), Ok(true));

        // right side is never evaluated, so its bad template is not an error
        let short = json!({"op": "and", "left": false, "right": "{{opId.missing.x}}"});
        assert_eq!(eval(short), Ok(false));
    }

    #[test]
    fn test_string_conditions() {
        assert_eq!(eval(json!("{{opId.a.value}} > 3")), Ok(true));
        assert_eq!(eval(json!("'{{opId.a.name}}' == 'Ada Lovelace'")), Ok(true));
        assert_eq!(eval(json!("{{opId.b._status}} == 'ERROR'")), Ok(false));
        assert_eq!(eval(json!("'{{opId.b._status}}' == 'ERROR'")), Ok(true));
        assert_eq!(eval(json!("{{opId.a.tags}}")), Ok(true));
        assert_eq!(eval(json!("this is not an expression")), Ok(false));
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval(json!(true)), Ok(true));
        assert_eq!(eval(json!(0)), Ok(false));
        assert_eq!(eval(json!(null)), Ok(false));
    }

    #[test]
    fn test_unresolved_template_is_an_error() {
        assert_eq!(
            eval(json!({"op": "eq", "left": "{{opId.ghost.value}}", "right": 1})),
            Err(ResolutionError::UnknownOpId { id: "ghost".into() })
        );
        assert!(eval(json!("{{loop.i}} > 1")).is_err());
    }
}
