// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod archive;
pub mod collaborators;
pub mod driver;
pub mod observer;

pub use archive::{PacketArchive, PacketRecord};
pub use collaborators::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, KeyValueStore, LlmRequest, LlmService,
    Notification, NotificationSink, NotifyOutcome,
};
pub use driver::{DispatchContext, Driver};
pub use observer::{ExecutionObserver, LogEntry, LogLevel, NoopObserver};
