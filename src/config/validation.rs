// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of packets prior to execution.
//!
//! Validation runs on the raw JSON document rather than the typed model so
//! that every problem can be reported with its location in one pass, instead
//! of stopping at the first deserialization failure.
//!
//! # Rules
//!
//! 1. `ucp_version` and `id` are non-empty strings
//! 2. `ops` is a non-empty array
//! 3. Standard operations carry `op` in `<namespace>.<method>` form
//! 4. Control-flow operations carry their required child arrays, non-empty,
//!    and those children are themselves valid
//! 5. Control-flow nesting stays within the configured depth
//!
//! # Example
//! ```rust
//! use serde_json::json;
//! use ucp_runner::config::validate_packet;
//!
//! let packet = json!({
//!     "ucp_version": "0.1",
//!     "id": "pkt",
//!     "ops": [{ "op": "nodot" }, { "type": "loop", "ops": [] }]
//! });
//!
//! let errors = validate_packet(&packet).unwrap_err();
//! assert_eq!(errors.len(), 3);
//! for error in errors {
//!     eprintln!("Validation error: {}", error);
//! }
//! ```

use serde_json::Value;

use crate::config::consts::DEFAULT_MAX_NESTING_DEPTH;
use crate::errors::ValidationError;
use crate::packet::canonical::{display_value, is_truthy};

/// Validate a packet document with the default nesting limit.
pub fn validate_packet(raw: &Value) -> Result<(), Vec<ValidationError>> {
    validate_packet_with_limit(raw, DEFAULT_MAX_NESTING_DEPTH)
}

/// Validate a packet document, collecting all errors.
pub fn validate_packet_with_limit(
    raw: &Value,
    max_depth: usize,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let Some(packet) = raw.as_object() else {
        return Err(vec![ValidationError::NotAnObject {
            path: "packet".to_string(),
        }]);
    };

    for field in ["ucp_version", "id"] {
        match packet.get(field) {
            Some(Value::String(s)) if !s.is_empty() => {}
            Some(value) if is_truthy(value) => errors.push(ValidationError::InvalidField {
                field: field.to_string(),
                expected: "a string".to_string(),
            }),
            _ => errors.push(ValidationError::MissingField {
                field: field.to_string(),
            }),
        }
    }

    match packet.get("ops") {
        Some(Value::Array(ops)) if !ops.is_empty() => {
            validate_ops(ops, "ops", 1, max_depth, &mut errors);
        }
        _ => errors.push(ValidationError::MissingChildren {
            path: "packet".to_string(),
            field: "ops".to_string(),
        }),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_ops(
    ops: &[Value],
    path: &str,
    depth: usize,
    max_depth: usize,
    errors: &mut Vec<ValidationError>,
) {
    for (index, op) in ops.iter().enumerate() {
        let op_path = format!("{}[{}]", path, index);
        validate_op(op, &op_path, depth, max_depth, errors);
    }
}

fn validate_op(
    op: &Value,
    path: &str,
    depth: usize,
    max_depth: usize,
    errors: &mut Vec<ValidationError>,
) {
    let Some(fields) = op.as_object() else {
        errors.push(ValidationError::NotAnObject {
            path: path.to_string(),
        });
        return;
    };

    let kind = match fields.get("type") {
        None | Some(Value::Null) => None,
        Some(Value::String(kind)) => Some(kind.as_str()),
        Some(other) => {
            errors.push(ValidationError::UnknownOperationType {
                path: path.to_string(),
                kind: display_value(other),
            });
            return;
        }
    };

    let Some(kind) = kind else {
        match fields.get("op") {
            None | Some(Value::Null) => errors.push(ValidationError::MissingOpName {
                path: path.to_string(),
            }),
            Some(Value::String(name)) if name.contains('.') => {}
            Some(other) => errors.push(ValidationError::InvalidOpName {
                path: path.to_string(),
                op: display_value(other),
            }),
        }
        return;
    };

    if depth >= max_depth {
        errors.push(ValidationError::NestingTooDeep {
            path: path.to_string(),
            max_depth,
        });
        return;
    }

    let children = |field: &str, required: bool, errors: &mut Vec<ValidationError>| {
        match fields.get(field) {
            Some(Value::Array(items)) if !items.is_empty() => {
                validate_ops(items, &format!("{}.{}", path, field), depth + 1, max_depth, errors);
            }
            Some(Value::Array(_)) if !required => {}
            None | Some(Value::Null) if !required => {}
            _ => errors.push(ValidationError::MissingChildren {
                path: path.to_string(),
                field: field.to_string(),
            }),
        }
    };

    match kind {
        "conditional" | "if" => {
            if matches!(fields.get("condition"), None | Some(Value::Null)) {
                errors.push(ValidationError::MissingCondition {
                    path: path.to_string(),
                });
            }
            children("then", true, errors);
            children("else", false, errors);
        }
        "loop" | "foreach" => {
            let has_source = ["items", "count", "range"]
                .iter()
                .any(|key| !matches!(fields.get(*key), None | Some(Value::Null)));
            if !has_source {
                errors.push(ValidationError::MissingIterationSource {
                    path: path.to_string(),
                });
            }
            if let Some(range) = fields.get("range").filter(|r| !r.is_null()) {
                let valid = range
                    .as_array()
                    .map(|bounds| bounds.len() == 2 && bounds.iter().all(Value::is_number))
                    .unwrap_or(false);
                if !valid {
                    errors.push(ValidationError::InvalidRange {
                        path: path.to_string(),
                    });
                }
            }
            children("ops", true, errors);
        }
        "parallel" => children("ops", true, errors),
        "try" => {
            children("ops", true, errors);
            children("catch", false, errors);
            children("finally", false, errors);
        }
        other => errors.push(ValidationError::UnknownOperationType {
            path: path.to_string(),
            kind: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn packet(ops: Value) -> Value {
        json!({"ucp_version": "0.1", "id": "pkt_test", "ops": ops})
    }

    #[test]
    fn test_valid_packet_with_every_construct() {
        let raw = packet(json!([
            {"op": "transform.set", "args": {"value": 1}},
            {"type": "if", "condition": "1 < 2", "then": [{"op": "notify.show"}]},
            {"type": "loop", "range": [0, 3], "ops": [{"op": "wait.delay"}]},
            {"type": "parallel", "ops": [{"op": "http.get"}]},
            {"type": "try", "ops": [{"op": "http.get"}], "catch": [], "finally": [{"op": "local.delete"}]}
        ]));
        assert_eq!(validate_packet(&raw), Ok(()));
    }

    #[test]
    fn test_missing_top_level_fields() {
        let errors = validate_packet(&json!({"ops": []})).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingField {
                    field: "ucp_version".into()
                },
                ValidationError::MissingField { field: "id".into() },
                ValidationError::MissingChildren {
                    path: "packet".into(),
                    field: "ops".into()
                },
            ]
        );
    }

    #[test]
    fn test_non_string_id() {
        let raw = json!({"ucp_version": "0.1", "id": 7, "ops": [{"op": "a.b"}]});
        let errors = validate_packet(&raw).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::InvalidField { field, .. } if field == "id"));
    }

    #[test]
    fn test_standard_op_name_rules() {
        let raw = packet(json!([{"args": {}}, {"op": "nodot"}, {"op": 5}, {"op": "a.b.c"}]));
        let errors = validate_packet(&raw).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingOpName {
                    path: "ops[0]".into()
                },
                ValidationError::InvalidOpName {
                    path: "ops[1]".into(),
                    op: "nodot".into()
                },
                ValidationError::InvalidOpName {
                    path: "ops[2]".into(),
                    op: "5".into()
                },
            ]
        );
    }

    #[test]
    fn test_nested_errors_carry_paths() {
        let raw = packet(json!([
            {"type": "conditional", "condition": true,
             "then": [{"type": "try", "ops": [{"op": "bad"}]}],
             "else": [{"type": "parallel"}]}
        ]));
        let errors = validate_packet(&raw).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidOpName {
                    path: "ops[0].then[0].ops[0]".into(),
                    op: "bad".into()
                },
                ValidationError::MissingChildren {
                    path: "ops[0].else[0]".into(),
                    field: "ops".into()
                },
            ]
        );
    }

    #[test]
    fn test_control_flow_requirements() {
        let raw = packet(json!([
            {"type": "if", "then": []},
            {"type": "foreach", "ops": [{"op": "a.b"}]},
            {"type": "loop", "range": [1], "ops": [{"op": "a.b"}]},
            {"type": "switch", "ops": []}
        ]));
        let errors = validate_packet(&raw).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingCondition {
                    path: "ops[0]".into()
                },
                ValidationError::MissingChildren {
                    path: "ops[0]".into(),
                    field: "then".into()
                },
                ValidationError::MissingIterationSource {
                    path: "ops[1]".into()
                },
                ValidationError::InvalidRange {
                    path: "ops[2]".into()
                },
                ValidationError::UnknownOperationType {
                    path: "ops[3]".into(),
                    kind: "switch".into()
                },
            ]
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut op = json!({"op": "a.b"});
        for _ in 0..4 {
            op = json!({"type": "parallel", "ops": [op]});
        }
        let raw = packet(json!([op]));
        assert_eq!(validate_packet_with_limit(&raw, 5), Ok(()));

        let errors = validate_packet_with_limit(&raw, 4).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NestingTooDeep {
                path: "ops[0].ops[0].ops[0].ops[0]".into(),
                max_depth: 4
            }]
        );
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            validate_packet(&json!([1, 2])),
            Err(vec![ValidationError::NotAnObject {
                path: "packet".into()
            }])
        );
    }
}
