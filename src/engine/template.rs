// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Template resolution: `{{kind.path}}` placeholders in argument trees.
//!
//! | Token | Source |
//! |---|---|
//! | `{{opId.<id>.<path>}}` | result entry recorded under step id `<id>` |
//! | `{{op.<index>.<path>}}` | result entry at execution index `<index>` |
//! | `{{loop.<name>.<path>}}` / `{{var.<name>.<path>}}` | enclosing loop context |
//!
//! Paths are dotted and accept `name[idx]` array segments. A string that is
//! exactly one token resolves to the referenced value with its JSON type
//! intact; tokens embedded in longer text are spliced as text, with objects
//! and arrays written in canonical form.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::engine::result_store::ResultStore;
use crate::errors::ResolutionError;
use crate::packet::canonical::display_value;

static TEMPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(opId|op|loop|var)\.([^}]+)\}\}").expect("TEMPLATE_PATTERN regex should compile")
});

/// Variable bindings visible to operations nested inside loops (and catch
/// blocks). Child scopes copy their parent's bindings, so inner loops see
/// every enclosing binding unless they shadow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopContext {
    bindings: Map<String, Value>,
}

impl LoopContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A child scope holding the parent's bindings plus `bindings`.
    pub fn derive<I>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut child = self.clone();
        child.bindings.extend(bindings);
        child
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

/// Resolve every template token in `value`, preserving its shape.
pub fn resolve(
    value: &Value,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<Value, ResolutionError> {
    match value {
        Value::String(text) => resolve_str(text, store, context),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, store, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), resolve(item, store, context)?)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Resolve the tokens in a single string.
pub fn resolve_str(
    text: &str,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<Value, ResolutionError> {
    if !text.contains("{{") {
        return Ok(Value::String(text.to_string()));
    }

    if let Some(captures) = TEMPLATE_PATTERN.captures(text) {
        if captures[0].len() == text.len() {
            return lookup(&captures, store, context);
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in TEMPLATE_PATTERN.captures_iter(text) {
        let Some(token) = captures.get(0) else {
            continue;
        };
        out.push_str(&text[last..token.start()]);
        out.push_str(&display_value(&lookup(&captures, store, context)?));
        last = token.end();
    }
    out.push_str(&text[last..]);
    Ok(Value::String(out))
}

fn lookup(
    captures: &Captures<'_>,
    store: &ResultStore,
    context: &LoopContext,
) -> Result<Value, ResolutionError> {
    let kind = &captures[1];
    let path = captures[2].trim();
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));

    match kind {
        "opId" => {
            let entry = store
                .get_by_id(head)
                .ok_or_else(|| ResolutionError::UnknownOpId {
                    id: head.to_string(),
                })?;
            navigate_entry(&entry.view(), kind, path, rest)
        }
        "op" => {
            let entry = head
                .parse::<usize>()
                .ok()
                .and_then(|index| store.get_by_index(index))
                .ok_or_else(|| ResolutionError::UnknownIndex {
                    index: head.to_string(),
                })?;
            navigate_entry(&entry.view(), kind, path, rest)
        }
        _ => context
            .get(head)
            .and_then(|root| get_path(root, rest))
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownVariable {
                name: path.to_string(),
            }),
    }
}

fn navigate_entry(
    view: &Value,
    kind: &str,
    path: &str,
    rest: &str,
) -> Result<Value, ResolutionError> {
    get_path(view, rest)
        .cloned()
        .ok_or_else(|| ResolutionError::MissingPath {
            token: format!("{}.{}", kind, path),
            path: rest.to_string(),
        })
}

/// Navigate a dotted path (with optional `name[idx]` segments) into `root`.
/// An empty path yields `root` itself.
///
/// # Example
/// ```
/// use serde_json::json;
/// use ucp_runner::engine::get_path;
///
/// let doc = json!({"users": [{"name": "ada"}, {"name": "grace"}]});
/// assert_eq!(get_path(&doc, "users[1].name"), Some(&json!("grace")));
/// assert_eq!(get_path(&doc, "users.0.name"), Some(&json!("ada")));
/// assert_eq!(get_path(&doc, "users[5].name"), None);
/// ```
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        let (key, indices) = split_segment(segment)?;
        if !key.is_empty() {
            current = step(current, key)?;
        }
        for index in indices {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

fn step<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn split_segment(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    let key = &segment[..open];
    let mut indices = Vec::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indices.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((key, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result_store::OpStatus;
    use serde_json::json;

    fn store_with_a() -> ResultStore {
        let store = ResultStore::new();
        let index = store.next_index();
        store.set(
            index,
            Some("a"),
            json!({"value": 5, "user": {"tags": ["x", "y"]}}),
            OpStatus::Ok,
        );
        store
    }

    #[test]
    fn test_splices_tokens_into_text() {
        let store = store_with_a();
        let resolved = resolve(
            &json!({"value": "{{opId.a.value}}-ok"}),
            &store,
            &LoopContext::new(),
        )
        .unwrap();
        assert_eq!(resolved, json!({"value": "5-ok"}));
    }

    #[test]
    fn test_whole_token_keeps_json_type() {
        let store = store_with_a();
        let ctx = LoopContext::new();
        assert_eq!(
            resolve_str("{{opId.a.value}}", &store, &ctx).unwrap(),
            json!(5)
        );
        assert_eq!(
            resolve_str("{{opId.a.user}}", &store, &ctx).unwrap(),
            json!({"tags": ["x", "y"]})
        );
    }

    #[test]
    fn test_embedded_structures_are_canonical() {
        let store = store_with_a();
        let resolved =
            resolve_str("tags={{opId.a.user}}", &store, &LoopContext::new()).unwrap();
        assert_eq!(resolved, json!(r#"tags={"tags":["x","y"]}"#));
    }

    #[test]
    fn test_index_addressing_and_array_segments() {
        let store = store_with_a();
        let ctx = LoopContext::new();
        assert_eq!(
            resolve_str("{{op.0.user.tags[1]}}", &store, &ctx).unwrap(),
            json!("y")
        );
        assert_eq!(
            resolve_str("{{op.0._status}}/{{opId.a._index}}", &store, &ctx).unwrap(),
            json!("OK/0")
        );
    }

    #[test]
    fn test_loop_and_var_bindings() {
        let store = ResultStore::new();
        let outer = LoopContext::new().derive([("row".to_string(), json!({"id": 7}))]);
        let inner = outer.derive([
            ("n".to_string(), json!(2)),
            ("first".to_string(), json!(true)),
        ]);
        let resolved = resolve(
            &json!(["{{loop.n}}_hits", "{{var.row.id}}", "{{loop.first}}", 3]),
            &store,
            &inner,
        )
        .unwrap();
        assert_eq!(resolved, json!(["2_hits", 7, true, 3]));
    }

    #[test]
    fn test_unresolvable_tokens() {
        let store = store_with_a();
        let ctx = LoopContext::new();
        assert_eq!(
            resolve_str("{{opId.missing.value}}", &store, &ctx),
            Err(ResolutionError::UnknownOpId {
                id: "missing".into()
            })
        );
        assert_eq!(
            resolve_str("x {{op.9.value}}", &store, &ctx),
            Err(ResolutionError::UnknownIndex { index: "9".into() })
        );
        assert_eq!(
            resolve_str("{{opId.a.nope}}", &store, &ctx),
            Err(ResolutionError::MissingPath {
                token: "opId.a.nope".into(),
                path: "nope".into()
            })
        );
        assert_eq!(
            resolve_str("{{loop.item}}", &store, &ctx),
            Err(ResolutionError::UnknownVariable {
                name: "item".into()
            })
        );
    }

    #[test]
    fn test_values_without_tokens_are_unchanged() {
        let store = ResultStore::new();
        let ctx = LoopContext::new();
        let cases = vec![
            json!(null),
            json!({"a": [1, "two", {"b": false}], "c": "{{unknown.kind}}"}),
            json!("{{ not a token"),
            json!(3.5),
        ];
        for value in cases {
            assert_eq!(resolve(&value, &store, &ctx).unwrap(), value);
        }
    }
}
