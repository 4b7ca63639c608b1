// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Packet and operation data model.
//!
//! A packet is a versioned, identified program: an ordered tree of operations.
//! Standard operations call a driver (`namespace.method`); control-flow
//! operations are tagged by their `type` field.
//!
//! # Example
//! ```json
//! {
//!   "ucp_version": "0.1",
//!   "id": "pkt_counter",
//!   "ops": [
//!     { "op": "transform.set", "id": "a", "args": { "value": 5 } },
//!     {
//!       "type": "loop", "count": 3, "as": "n",
//!       "ops": [{ "op": "local.increment", "args": { "key": "{{loop.n}}_hits", "by": 1 } }]
//!     }
//!   ]
//! }
//! ```

use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::validation::validate_packet;
use crate::errors::ValidationError;
use crate::packet::canonical::{canonicalize, digest};

/// A packet: the unit of execution.
///
/// Fields the engine does not interpret (`ttl_seconds`, `permissions`,
/// `signature`, ...) are kept in `extensions` so they stay covered by the
/// packet hash. Every operation carries its own `extensions` for the same
/// reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub ucp_version: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub ops: Vec<Operation>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Packet {
    /// Validate a raw packet document and convert it into the typed model.
    pub fn from_value(raw: Value) -> Result<Self, Vec<ValidationError>> {
        validate_packet(&raw)?;
        serde_json::from_value(raw).map_err(|e| {
            vec![ValidationError::Malformed {
                reason: e.to_string(),
            }]
        })
    }

    /// Parse and validate a packet from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, Vec<ValidationError>> {
        let raw: Value = serde_json::from_str(text).map_err(|e| {
            vec![ValidationError::Malformed {
                reason: e.to_string(),
            }]
        })?;
        Self::from_value(raw)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// SHA-256 over the canonical serialization of the packet.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        Ok(digest(&canonicalize(&self.to_value()?)))
    }

    /// Number of operation nodes, counting control-flow nodes and every
    /// statically nested child once.
    pub fn total_ops(&self) -> usize {
        count_ops(&self.ops)
    }
}

pub fn count_ops(ops: &[Operation]) -> usize {
    ops.iter().map(Operation::static_size).sum()
}

/// The kind of an operation, as reported in receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Standard,
    Conditional,
    Loop,
    Parallel,
    Try,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Standard => "standard",
            OpKind::Conditional => "conditional",
            OpKind::Loop => "loop",
            OpKind::Parallel => "parallel",
            OpKind::Try => "try",
        }
    }
}

/// One step of a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Standard(StandardOp),
    Conditional(ConditionalOp),
    Loop(LoopOp),
    Parallel(ParallelOp),
    Try(TryOp),
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Standard(_) => OpKind::Standard,
            Operation::Conditional(_) => OpKind::Conditional,
            Operation::Loop(_) => OpKind::Loop,
            Operation::Parallel(_) => OpKind::Parallel,
            Operation::Try(_) => OpKind::Try,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Operation::Standard(op) => op.id.as_deref(),
            Operation::Conditional(op) => op.id.as_deref(),
            Operation::Loop(op) => op.id.as_deref(),
            Operation::Parallel(op) => op.id.as_deref(),
            Operation::Try(op) => op.id.as_deref(),
        }
    }

    pub fn continue_on_error(&self) -> bool {
        match self {
            Operation::Standard(op) => op.continue_on_error,
            Operation::Conditional(op) => op.continue_on_error,
            Operation::Loop(op) => op.continue_on_error,
            Operation::Parallel(op) => op.continue_on_error,
            Operation::Try(op) => op.continue_on_error,
        }
    }

    /// The `namespace.method` for standard ops, the type keyword otherwise.
    pub fn label(&self) -> &str {
        match self {
            Operation::Standard(op) => &op.op,
            Operation::Conditional(op) => op.form.keyword(),
            Operation::Loop(op) => op.form.keyword(),
            Operation::Parallel(_) => "parallel",
            Operation::Try(_) => "try",
        }
    }

    pub fn static_size(&self) -> usize {
        match self {
            Operation::Standard(_) => 1,
            Operation::Conditional(op) => {
                1 + count_ops(&op.then) + op.else_.as_deref().map(count_ops).unwrap_or(0)
            }
            Operation::Loop(op) => 1 + count_ops(&op.ops),
            Operation::Parallel(op) => 1 + count_ops(&op.ops),
            Operation::Try(op) => {
                1 + count_ops(&op.ops)
                    + op.catch.as_deref().map(count_ops).unwrap_or(0)
                    + op.finally.as_deref().map(count_ops).unwrap_or(0)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        // The keyword is restored from the variant on serialization.
        if kind.is_some() {
            if let Some(fields) = value.as_object_mut() {
                fields.remove("type");
            }
        }

        let op = match kind.as_deref() {
            None => Operation::Standard(serde_json::from_value(value).map_err(D::Error::custom)?),
            Some(keyword @ ("conditional" | "if")) => {
                let mut op: ConditionalOp =
                    serde_json::from_value(value).map_err(D::Error::custom)?;
                op.form = if keyword == "if" {
                    ConditionalForm::If
                } else {
                    ConditionalForm::Conditional
                };
                Operation::Conditional(op)
            }
            Some(keyword @ ("loop" | "foreach")) => {
                let mut op: LoopOp = serde_json::from_value(value).map_err(D::Error::custom)?;
                op.form = if keyword == "foreach" {
                    LoopForm::Foreach
                } else {
                    LoopForm::Loop
                };
                Operation::Loop(op)
            }
            Some("parallel") => {
                Operation::Parallel(serde_json::from_value(value).map_err(D::Error::custom)?)
            }
            Some("try") => Operation::Try(serde_json::from_value(value).map_err(D::Error::custom)?),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "unknown operation type '{}'",
                    other
                )))
            }
        };
        Ok(op)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (encoded, keyword) = match self {
            Operation::Standard(op) => {
                return op.serialize(serializer);
            }
            Operation::Conditional(op) => (serde_json::to_value(op), op.form.keyword()),
            Operation::Loop(op) => (serde_json::to_value(op), op.form.keyword()),
            Operation::Parallel(op) => (serde_json::to_value(op), "parallel"),
            Operation::Try(op) => (serde_json::to_value(op), "try"),
        };
        let mut value = encoded.map_err(S::Error::custom)?;
        value
            .as_object_mut()
            .ok_or_else(|| S::Error::custom("control operation did not serialize to an object"))?
            .insert("type".to_string(), Value::String(keyword.to_string()));
        value.serialize(serializer)
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A driver call: `{ op: "namespace.method", id?, args, skipIf?, runIf?, continueOnError? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardOp {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl StandardOp {
    /// Split `namespace.method` at the first dot.
    pub fn namespace_and_method(&self) -> Option<(&str, &str)> {
        self.op.split_once('.')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionalForm {
    #[default]
    Conditional,
    If,
}

impl ConditionalForm {
    pub fn keyword(&self) -> &'static str {
        match self {
            ConditionalForm::Conditional => "conditional",
            ConditionalForm::If => "if",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalOp {
    #[serde(skip)]
    pub form: ConditionalForm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub condition: Condition,
    pub then: Vec<Operation>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_: Option<Vec<Operation>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopForm {
    #[default]
    Loop,
    Foreach,
}

impl LoopForm {
    pub fn keyword(&self) -> &'static str {
        match self {
            LoopForm::Loop => "loop",
            LoopForm::Foreach => "foreach",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopOp {
    #[serde(skip)]
    pub form: LoopForm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Value>,
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub as_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_as: Option<String>,
    pub ops: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_if: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl LoopOp {
    pub fn item_binding(&self) -> &str {
        self.as_.as_deref().unwrap_or("item")
    }

    pub fn index_binding(&self) -> &str {
        self.index_as.as_deref().unwrap_or("index")
    }

    /// A child error ends the loop unless `breakOnError` is explicitly `false`.
    pub fn breaks_on_error(&self) -> bool {
        self.break_on_error != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ops: Vec<Operation>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub race: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub all_settled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ParallelOp {
    /// Child failures do not fail the block.
    pub fn absorbs_failures(&self) -> bool {
        self.all_settled || self.continue_on_error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ops: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<Operation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finally: Option<Vec<Operation>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_catch_error: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// A boolean condition: an expression string, a structured comparison, or
/// any other literal (judged by truthiness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Expression(String),
    Structured(StructuredCondition),
    Literal(Value),
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Condition::Expression(s),
            other => serde_json::from_value(other.clone()).unwrap_or(Condition::Literal(other)),
        }
    }
}

/// `{ op, left?, right?, value?, field? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCondition {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
