// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default per-call HTTP timeout (15 seconds)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
/// Minimum allowed per-call HTTP timeout
pub const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Maximum allowed per-call HTTP timeout (2 minutes)
pub const MAX_HTTP_TIMEOUT_MS: u64 = 120_000;

/// Default `wait.until` deadline (30 seconds)
pub const DEFAULT_UNTIL_TIMEOUT_MS: u64 = 30_000;
/// Default `wait.until` poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 1;
/// Default `wait.delay` duration
pub const DEFAULT_DELAY_MS: u64 = 1_000;

/// Characters per estimated LLM token
pub const DEFAULT_CHARS_PER_TOKEN: u64 = 4;
/// Default word budget for `llm.summarize`
pub const DEFAULT_SUMMARY_MAX_LENGTH: u64 = 100;

/// Control-flow nesting accepted by the validator
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Iterations a single loop may run before it fails
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Upper bound accepted for `llm.chars_per_token`
pub const MAX_CHARS_PER_TOKEN: u64 = 64;
/// Upper bound accepted for `limits.max_nesting_depth`
pub const MAX_NESTING_DEPTH_LIMIT: usize = 256;
/// Upper bound accepted for `limits.max_iterations`
pub const MAX_ITERATIONS_LIMIT: usize = 10_000_000;

/// Default page sizes for archive listings
pub const DEFAULT_RECENT_PACKETS: usize = 20;
pub const DEFAULT_RECENT_RECEIPTS: usize = 10;
