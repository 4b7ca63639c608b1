// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::loader::EngineConfig;
use crate::config::runtime::Collaborators;
use crate::drivers::{HttpDriver, LlmDriver, LocalDriver, NotifyDriver, TransformDriver, WaitDriver};
use crate::errors::DriverError;
use crate::observability::messages::driver::DriverDispatched;
use crate::observability::messages::StructuredLog;
use crate::traits::{DispatchContext, Driver};

/// Routes `namespace.method` operations to registered drivers.
#[derive(Clone, Default)]
pub struct DriverRouter(HashMap<&'static str, Arc<dyn Driver>>);

impl DriverRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six standard drivers wired to the given collaborators.
    pub fn with_standard_drivers(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        let mut router = Self::new();
        router.register(Arc::new(HttpDriver::new(
            collaborators.http.clone(),
            config.http.clone(),
        )));
        router.register(Arc::new(LocalDriver::new(collaborators.kv.clone())));
        router.register(Arc::new(NotifyDriver::new(
            collaborators.notifier.clone(),
            collaborators.notify_fallback.clone(),
        )));
        router.register(Arc::new(TransformDriver));
        router.register(Arc::new(WaitDriver::new(config.wait.clone())));
        router.register(Arc::new(LlmDriver::new(
            collaborators.llm.clone(),
            config.llm.clone(),
        )));
        router
    }

    /// Register a driver under its namespace, returning any driver it replaces.
    pub fn register(&mut self, driver: Arc<dyn Driver>) -> Option<Arc<dyn Driver>> {
        self.0.insert(driver.namespace(), driver)
    }

    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    pub fn get(&self, namespace: &str) -> Option<&Arc<dyn Driver>> {
        self.0.get(namespace)
    }

    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.0.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Argument keys the engine must pass through unresolved.
    pub fn deferred_args(&self, namespace: &str, method: &str) -> &'static [&'static str] {
        self.get(namespace)
            .map(|driver| driver.deferred_args(method))
            .unwrap_or(&[])
    }

    pub async fn dispatch(
        &self,
        namespace: &str,
        method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        if ctx.cancel.is_cancelled() {
            return Err(DriverError::Cancelled);
        }

        let driver = self
            .get(namespace)
            .ok_or_else(|| DriverError::UnknownNamespace(namespace.to_string()))?;

        if !driver.methods().contains(&method) {
            return Err(DriverError::UnknownMethod {
                namespace: namespace.to_string(),
                method: method.to_string(),
            });
        }

        DriverDispatched { namespace, method }.log();
        driver.call(method, args, ctx).await
    }
}

impl std::fmt::Debug for DriverRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRouter")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

impl From<HashMap<&'static str, Arc<dyn Driver>>> for DriverRouter {
    fn from(map: HashMap<&'static str, Arc<dyn Driver>>) -> Self {
        DriverRouter(map)
    }
}

impl From<Vec<Arc<dyn Driver>>> for DriverRouter {
    fn from(drivers: Vec<Arc<dyn Driver>>) -> Self {
        drivers
            .into_iter()
            .fold(DriverRouter::new(), DriverRouter::with_driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stub::{DispatchFixture, EchoDriver};
    use serde_json::json;

    #[tokio::test]
    async fn test_standard_router_has_six_namespaces() {
        let router =
            DriverRouter::with_standard_drivers(&Collaborators::default(), &EngineConfig::default());
        assert_eq!(
            router.namespaces(),
            vec!["http", "llm", "local", "notify", "transform", "wait"]
        );
        assert_eq!(router.deferred_args("wait", "until"), &["condition"]);
        assert!(router.deferred_args("nope", "until").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_namespace_and_method() {
        let fixture = DispatchFixture::new();
        let router = DriverRouter::from(vec![Arc::new(EchoDriver) as Arc<dyn Driver>]);

        let err = router
            .dispatch("ftp", "get", json!({}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::UnknownNamespace("ftp".into()));

        let err = router
            .dispatch("echo", "shout", json!({}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown echo method: shout");
    }

    #[tokio::test]
    async fn test_dispatch_reaches_driver() {
        let fixture = DispatchFixture::new();
        let router = DriverRouter::new().with_driver(Arc::new(EchoDriver));
        let out = router
            .dispatch("echo", "say", json!({"x": 1}), fixture.ctx())
            .await
            .unwrap();
        assert_eq!(out, json!({"method": "say", "args": {"x": 1}}));
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let fixture = DispatchFixture::new();
        fixture.cancel.cancel();
        let router = DriverRouter::new().with_driver(Arc::new(EchoDriver));
        let err = router
            .dispatch("echo", "say", json!({}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::Cancelled);
    }

    #[test]
    fn test_debug_lists_namespaces() {
        let router = DriverRouter::new().with_driver(Arc::new(EchoDriver));
        assert_eq!(format!("{:?}", router), r#"DriverRouter { namespaces: ["echo"] }"#);
    }
}
