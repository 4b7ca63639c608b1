// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Capability drivers and the router that dispatches to them.
//!
//! Each driver owns one namespace (`http`, `local`, `notify`, `transform`,
//! `wait`, `llm`) and delegates external effects to the collaborator traits
//! in [`crate::traits`].

pub mod args; // Resolved-argument accessors
pub mod clients; // Shipped collaborator implementations
pub mod http;
pub mod llm;
pub mod local;
pub mod notify;
pub mod router; // Namespace -> driver dispatch
pub mod transform;
pub mod wait;

#[cfg(test)]
pub mod stub;

pub use http::HttpDriver;
pub use llm::LlmDriver;
pub use local::LocalDriver;
pub use notify::NotifyDriver;
pub use router::DriverRouter;
pub use transform::TransformDriver;
pub use wait::WaitDriver;
