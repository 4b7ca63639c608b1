// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod condition; // skipIf/runIf/breakIf/continueIf evaluation
pub mod executor; // Operation tree interpreter
pub mod expression; // Sandboxed comparison-and-boolean language
pub mod receipt; // Receipt assembly and hashing
pub mod result_store; // Append-only per-run results
pub mod template; // {{...}} resolution and loop contexts
pub mod tokens; // LLM token accounting

pub use condition::{evaluate_condition, evaluate_condition_value};
pub use executor::{baseline_tokens, ExecutionEngine};
pub use expression::evaluate_expression;
pub use receipt::{IterationOutcome, OpOutcome, OutcomeDetail, Receipt, ReceiptStatus};
pub use result_store::{OpStatus, ResultEntry, ResultStore};
pub use template::{get_path, resolve, LoopContext};
pub use tokens::{estimate_tokens, TokenStats, TokenTracker};
