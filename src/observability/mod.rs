// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every log line is a small message struct with a `Display` implementation
//! and a `StructuredLog` implementation that knows its level, its `tracing`
//! fields and, where useful, a structured payload for execution observers.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - packet run lifecycle, hashes and token summary
//! * `messages::operation` - per-operation transitions and control flow
//! * `messages::driver` - driver dispatch and collaborator events
//! * `messages::validation` - packet rejection
//!
//! # Usage
//!
//! ```rust
//! use ucp_runner::observability::messages::operation::OperationStarted;
//! use ucp_runner::observability::messages::StructuredLog;
//!
//! let msg = OperationStarted {
//!     index: 0,
//!     label: "transform.set",
//!     op_id: Some("a"),
//! };
//!
//! msg.log();
//! assert_eq!(msg.to_string(), "[0] Executing: transform.set");
//! ```

pub mod messages;
