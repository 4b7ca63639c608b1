// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution receipts.
//!
//! A receipt is the hashed record of one packet run. `packetHash` covers the
//! canonical form of the packet; `receiptHash` covers the canonical form of
//! the receipt itself with `receiptHash` held empty. Changing any field,
//! including a nested operation status, changes `receiptHash`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::result_store::OpStatus;
use crate::engine::tokens::TokenStats;
use crate::packet::canonical::{canonicalize_serialize, digest};
use crate::packet::OpKind;

/// Packet-level outcome: any `ERROR` operation fails the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    Success,
    Failed,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Success => "SUCCESS",
            ReceiptStatus::Failed => "FAILED",
        }
    }

    pub fn from_outcomes(outcomes: &[OpOutcome]) -> Self {
        if outcomes.iter().any(|outcome| outcome.status.is_error()) {
            ReceiptStatus::Failed
        } else {
            ReceiptStatus::Success
        }
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded outcome of one operation, with nested outcomes for control
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpOutcome {
    pub index: usize,
    /// `namespace.method` for standard operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default)]
    pub op_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: OpStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Failure message; for `try` blocks, the error that was caught
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub detail: OutcomeDetail,
}

impl OpOutcome {
    /// Every outcome in this subtree, pre-order.
    pub fn walk(&self) -> Vec<&OpOutcome> {
        let mut out = vec![self];
        for child in self.detail.children() {
            out.extend(child.walk());
        }
        out
    }
}

/// Control-flow specific fields, flattened into the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeDetail {
    #[serde(rename_all = "camelCase")]
    Conditional {
        condition_result: bool,
        branch: String,
        branch_results: Vec<OpOutcome>,
    },
    #[serde(rename_all = "camelCase")]
    Loop {
        iterations: usize,
        total_items: usize,
        iteration_results: Vec<IterationOutcome>,
    },
    #[serde(rename_all = "camelCase")]
    Parallel { parallel_results: Vec<OpOutcome> },
    #[serde(rename_all = "camelCase")]
    Try {
        caught: bool,
        try_results: Vec<OpOutcome>,
        catch_results: Vec<OpOutcome>,
        finally_results: Vec<OpOutcome>,
    },
    Standard {},
}

impl OutcomeDetail {
    pub fn children(&self) -> Vec<&OpOutcome> {
        match self {
            OutcomeDetail::Conditional { branch_results, .. } => branch_results.iter().collect(),
            OutcomeDetail::Loop {
                iteration_results, ..
            } => iteration_results
                .iter()
                .flat_map(|iteration| iteration.results.iter())
                .collect(),
            OutcomeDetail::Parallel { parallel_results } => parallel_results.iter().collect(),
            OutcomeDetail::Try {
                try_results,
                catch_results,
                finally_results,
                ..
            } => try_results
                .iter()
                .chain(catch_results)
                .chain(finally_results)
                .collect(),
            OutcomeDetail::Standard {} => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationOutcome {
    pub iteration: usize,
    pub item: Value,
    pub results: Vec<OpOutcome>,
}

/// The hashed record of one packet execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub receipt_id: String,
    pub packet_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: ReceiptStatus,
    pub op_results: Vec<OpOutcome>,
    pub packet_hash: String,
    pub receipt_hash: String,
    pub token_stats: TokenStats,
}

impl Receipt {
    /// Build a receipt and seal it with its own hash.
    pub fn seal(
        packet_id: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        op_results: Vec<OpOutcome>,
        packet_hash: String,
        token_stats: TokenStats,
    ) -> Result<Self, serde_json::Error> {
        let mut receipt = Receipt {
            receipt_id: uuid::Uuid::new_v4().to_string(),
            packet_id,
            started_at,
            finished_at,
            status: ReceiptStatus::from_outcomes(&op_results),
            op_results,
            packet_hash,
            receipt_hash: String::new(),
            token_stats,
        };
        receipt.receipt_hash = receipt.compute_hash()?;
        Ok(receipt)
    }

    /// Digest of the canonical receipt with `receiptHash` held empty.
    ///
    /// # Example
    /// ```
    /// use ucp_runner::engine::receipt::Receipt;
    ///
    /// let now = chrono::Utc::now();
    /// let receipt = Receipt::seal(
    ///     "pkt".into(),
    ///     now,
    ///     now,
    ///     Vec::new(),
    ///     "0".repeat(64),
    ///     Default::default(),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(receipt.compute_hash().unwrap(), receipt.receipt_hash);
    /// assert!(receipt.verify());
    /// ```
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        let mut unsealed = self.clone();
        unsealed.receipt_hash = String::new();
        Ok(digest(&canonicalize_serialize(&unsealed)?))
    }

    /// True when the stored hash matches the content.
    pub fn verify(&self) -> bool {
        self.compute_hash()
            .map(|hash| hash == self.receipt_hash)
            .unwrap_or(false)
    }

    /// All outcomes, nested ones included, in pre-order.
    pub fn all_outcomes(&self) -> Vec<&OpOutcome> {
        self.op_results.iter().flat_map(OpOutcome::walk).collect()
    }
}
