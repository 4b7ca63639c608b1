// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Token usage accounting for LLM calls.
//!
//! Token counts are estimates derived from character length, never measured.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Snapshot of the accumulated counters, as attached to receipts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub saved_tokens: u64,
    pub baseline_tokens: u64,
    /// Percentage of the baseline not spent; negative when over baseline.
    pub efficiency: i64,
    pub calls: u64,
}

#[derive(Debug, Default)]
struct Counters {
    input: u64,
    output: u64,
    saved: u64,
    baseline: u64,
    calls: u64,
}

/// Per-run accumulator, owned by one engine instance.
#[derive(Debug, Default)]
pub struct TokenTracker {
    counters: Mutex<Counters>,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_baseline(baseline: u64) -> Self {
        let tracker = Self::default();
        tracker.set_baseline(baseline);
        tracker
    }

    pub fn set_baseline(&self, tokens: u64) {
        self.lock().baseline = tokens;
    }

    pub fn add_call(&self, input: u64, output: u64, saved: u64) {
        let mut counters = self.lock();
        counters.input += input;
        counters.output += output;
        counters.saved += saved;
        counters.calls += 1;
    }

    pub fn stats(&self) -> TokenStats {
        let counters = self.lock();
        let total = counters.input + counters.output;
        let efficiency = if counters.baseline > 0 {
            ((1.0 - total as f64 / counters.baseline as f64) * 100.0).round() as i64
        } else {
            0
        };
        TokenStats {
            input_tokens: counters.input,
            output_tokens: counters.output,
            total_tokens: total,
            saved_tokens: counters.saved,
            baseline_tokens: counters.baseline,
            efficiency,
            calls: counters.calls,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `ceil(chars / chars_per_token)`.
pub fn estimate_tokens(text: &str, chars_per_token: u64) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(chars_per_token.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens("", 4), 0);
        assert_eq!(estimate_tokens("abcd", 4), 1);
        assert_eq!(estimate_tokens("abcde", 4), 2);
        assert_eq!(estimate_tokens("héllo", 1), 5);
        assert_eq!(estimate_tokens("abc", 0), 3);
    }

    #[test]
    fn test_stats_accumulate() {
        let tracker = TokenTracker::with_baseline(100);
        tracker.add_call(10, 15, 0);
        tracker.add_call(5, 10, 5);

        let stats = tracker.stats();
        assert_eq!(
            stats,
            TokenStats {
                input_tokens: 15,
                output_tokens: 25,
                total_tokens: 40,
                saved_tokens: 5,
                baseline_tokens: 100,
                efficiency: 60,
                calls: 2,
            }
        );
    }

    #[test]
    fn test_efficiency_without_baseline_is_zero() {
        let tracker = TokenTracker::new();
        tracker.add_call(3, 3, 0);
        assert_eq!(tracker.stats().efficiency, 0);
    }

    #[test]
    fn test_efficiency_can_go_negative() {
        let tracker = TokenTracker::with_baseline(10);
        tracker.add_call(10, 5, 0);
        assert_eq!(tracker.stats().efficiency, -50);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(TokenStats::default()).unwrap();
        assert!(json.get("inputTokens").is_some());
        assert!(json.get("baselineTokens").is_some());
    }
}
