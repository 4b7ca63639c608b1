// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Collaborator implementations shipped with the crate.

pub mod http;
pub mod kv;
pub mod notify;

pub use http::ReqwestHttpClient;
pub use kv::MemoryKvStore;
pub use notify::TracingNotificationSink;
