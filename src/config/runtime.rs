// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::loader::EngineConfig;
use crate::drivers::clients::{MemoryKvStore, ReqwestHttpClient, TracingNotificationSink};
use crate::drivers::DriverRouter;
use crate::engine::{ExecutionEngine, Receipt};
use crate::errors::ExecutionError;
use crate::packet::Packet;
use crate::traits::{
    ExecutionObserver, HttpClient, KeyValueStore, LlmService, NoopObserver, NotificationSink,
    PacketArchive,
};

/// The external services the standard drivers talk to.
///
/// Defaults are usable out of the box: a `reqwest` HTTP client, an in-memory
/// key-value store, and notifications written to the log. There is no
/// default LLM service, so `llm.*` operations fail with a not-configured
/// error until one is supplied.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn HttpClient>,
    pub kv: Arc<dyn KeyValueStore>,
    /// Primary notification channel, tried first when present
    pub notifier: Option<Arc<dyn NotificationSink>>,
    pub notify_fallback: Arc<dyn NotificationSink>,
    pub llm: Option<Arc<dyn LlmService>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            http: Arc::new(ReqwestHttpClient::default()),
            kv: Arc::new(MemoryKvStore::new()),
            notifier: None,
            notify_fallback: Arc::new(TracingNotificationSink),
            llm: None,
        }
    }
}

impl Collaborators {
    pub fn with_http(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn with_kv(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.kv = kv;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmService>) -> Self {
        self.llm = Some(llm);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("notifier", &self.notifier.is_some())
            .field("llm", &self.llm.is_some())
            .finish_non_exhaustive()
    }
}

/// Engine runtime builder - wires configuration, collaborators, the driver
/// router and the optional archive/observer into a reusable [`Runtime`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use ucp_runner::config::{EngineConfig, RuntimeBuilder};
/// use ucp_runner::packet::Packet;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = RuntimeBuilder::from_config(EngineConfig::default()).build();
///
/// let packet = Packet::from_value(json!({
///     "ucp_version": "0.1",
///     "id": "pkt_split",
///     "ops": [{"op": "transform.split", "args": {"value": "a,b,c"}}]
/// }))
/// .map_err(|errors| format!("{:?}", errors))?;
///
/// let receipt = runtime.run(packet).await?;
/// assert_eq!(receipt.op_results[0].output.as_ref().unwrap()["count"], json!(3));
/// # Ok(())
/// # }
/// ```
pub struct RuntimeBuilder {
    config: EngineConfig,
    collaborators: Collaborators,
    archive: Option<Arc<dyn PacketArchive>>,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl RuntimeBuilder {
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            collaborators: Collaborators::default(),
            archive: None,
            observer: None,
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn PacketArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Runtime {
        let router = DriverRouter::with_standard_drivers(&self.collaborators, &self.config);
        Runtime {
            router: Arc::new(router),
            config: Arc::new(self.config),
            archive: self.archive,
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
        }
    }
}

/// Shared, immutable wiring. Each packet gets its own [`ExecutionEngine`].
#[derive(Clone)]
pub struct Runtime {
    router: Arc<DriverRouter>,
    config: Arc<EngineConfig>,
    archive: Option<Arc<dyn PacketArchive>>,
    observer: Arc<dyn ExecutionObserver>,
}

impl Runtime {
    pub fn router(&self) -> &DriverRouter {
        &self.router
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh engine for `packet`, e.g. to keep a handle for `abort()`.
    pub fn engine(&self, packet: Packet) -> ExecutionEngine {
        let engine = ExecutionEngine::new(packet, self.router.clone(), self.config.clone())
            .with_observer(self.observer.clone());
        match &self.archive {
            Some(archive) => engine.with_archive(archive.clone()),
            None => engine,
        }
    }

    pub async fn run(&self, packet: Packet) -> Result<Receipt, ExecutionError> {
        self.engine(packet).execute().await
    }
}
