// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Adapter Registry - Provider Name to Adapter Factory
//
// Built once at process start and handed to the Dispatcher. Replaces any
// process-global engine map: resolution is a single keyed lookup per handle
// build, never a string branch at request time.

use crate::domain::llm::{AdapterConfig, ProviderAdapter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds an adapter for one resolved (provider, model, credentials) binding
pub trait AdapterFactory: Send + Sync + 'static {
    fn build(&self, config: &AdapterConfig) -> anyhow::Result<Arc<dyn ProviderAdapter>>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&AdapterConfig) -> anyhow::Result<Arc<dyn ProviderAdapter>> + Send + Sync + 'static,
{
    fn build(&self, config: &AdapterConfig) -> anyhow::Result<Arc<dyn ProviderAdapter>> {
        self(config)
    }
}

/// Registry for adapter factories keyed by provider name
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, Arc<dyn AdapterFactory>>,
    default_factory: Option<Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a provider name, replacing any previous one
    pub fn register(mut self, provider: &str, factory: impl AdapterFactory) -> Self {
        info!("Registering adapter factory for provider: {}", provider);
        self.factories.insert(provider.to_string(), Arc::new(factory));
        self
    }

    /// Factory used for providers without a dedicated registration
    pub fn with_default(mut self, factory: impl AdapterFactory) -> Self {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn supports(&self, provider: &str) -> bool {
        self.factories.contains_key(provider) || self.default_factory.is_some()
    }

    /// Provider names with a dedicated factory
    pub fn supported_providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build an adapter for a resolved binding
    pub fn build(&self, config: &AdapterConfig) -> anyhow::Result<Arc<dyn ProviderAdapter>> {
        let factory = self
            .factories
            .get(&config.provider)
            .or(self.default_factory.as_ref())
            .ok_or_else(|| anyhow::anyhow!("No adapter registered for provider '{}'", config.provider))?;

        debug!("Building adapter: {}/{}", config.provider, config.model);
        factory.build(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{ExecutionRequest, ExecutionResponse, TransportError};
    use crate::infrastructure::llm::DryRunAdapter;
    use async_trait::async_trait;
    use std::time::Duration;

    fn config(provider: &str) -> AdapterConfig {
        AdapterConfig {
            provider: provider.to_string(),
            model: "m".to_string(),
            api_key: "k".to_string(),
            base_url: String::new(),
            extra_config: Default::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    struct Refusing;

    #[async_trait]
    impl ProviderAdapter for Refusing {
        async fn execute(&self, _request: &ExecutionRequest) -> Result<ExecutionResponse, TransportError> {
            Err(TransportError::Provider("refused".into()))
        }
    }

    #[test]
    fn test_unknown_provider_without_default_fails() {
        let registry = AdapterRegistry::new().register("openai", |c: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            Ok(Arc::new(DryRunAdapter::new(c)))
        });

        assert!(registry.build(&config("openai")).is_ok());
        let err = registry.build(&config("qwen")).err().unwrap();
        assert!(err.to_string().contains("No adapter registered"));
        assert_eq!(registry.supported_providers(), vec!["openai"]);
    }

    #[test]
    fn test_default_factory_covers_unregistered_providers() {
        let registry = AdapterRegistry::new()
            .with_default(|_: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> { Ok(Arc::new(Refusing)) });
        assert!(registry.supports("chatglm"));
        assert!(registry.build(&config("chatglm")).is_ok());
    }

    #[test]
    fn test_factory_errors_propagate() {
        let registry = AdapterRegistry::new().register("ernie", |c: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            if c.extra_config.contains_key("secret_key") {
                Ok(Arc::new(Refusing))
            } else {
                anyhow::bail!("ernie requires a secret key")
            }
        });
        assert!(registry.build(&config("ernie")).is_err());
    }
}
