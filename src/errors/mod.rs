// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy.
//!
//! * `ValidationError` - malformed packet, reported before anything runs
//! * `ResolutionError` - unresolvable template token or path
//! * `DriverError` - downstream capability failure
//! * `OperationError` - what an operation's `ERROR` entry carries
//! * `ExecutionError` - packet-level failure to produce a receipt
//! * `ConfigError` - engine configuration loading
//! * `ArchiveError` - packet/receipt archive failures

mod archive;
mod config;
mod driver;
mod execution;
mod resolution;
mod validation;

pub use archive::ArchiveError;
pub use config::ConfigError;
pub use driver::DriverError;
pub use execution::{ExecutionError, OperationError};
pub use resolution::ResolutionError;
pub use validation::ValidationError;
