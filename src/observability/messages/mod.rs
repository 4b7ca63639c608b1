// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `engine` - packet run lifecycle
//! * `operation` - operation transitions
//! * `driver` - driver and collaborator events
//! * `validation` - packet validation failures

pub mod driver;
pub mod engine;
pub mod operation;
pub mod validation;

use std::fmt::Display;

use chrono::Utc;
use serde_json::Value;
use tracing::Span;

use crate::traits::observer::{LogEntry, LogLevel};

/// A log message that knows how to emit itself.
pub trait StructuredLog: Display {
    /// Emit through `tracing` with structured fields.
    fn log(&self);

    /// A span carrying the same fields.
    fn span(&self, name: &str) -> Span;

    /// Level in the execution log taxonomy.
    fn level(&self) -> LogLevel;

    /// Structured payload forwarded to execution observers.
    fn data(&self) -> Option<Value> {
        None
    }

    fn to_entry(&self) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: self.level(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}
