// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatcher
//!
//! Binds a (provider, model) choice to a live adapter handle and forwards
//! execution requests to it.
//!
//! The handle is cached with the resolved (provider, model, api key, base url)
//! it was built from. When a configuration reload changes any of those, the
//! next request rebuilds the handle. `switch_engine` builds the new handle
//! before swapping, so a failed switch leaves the previous binding serving.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request execution against the currently bound backend

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::application::selector::SelectionError;
use crate::domain::catalog::CatalogError;
use crate::domain::llm::{
    AdapterConfig, ChunkStream, ExecutionRequest, ExecutionResponse, ProviderAdapter, TransportError,
};
use crate::domain::selection::SelectionOutcome;
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::llm::registry::AdapterRegistry;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Switch to provider '{provider}' rejected: {source}")]
    SwitchRejected {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Provider '{0}' is not configured with credentials")]
    ProviderNotConfigured(String),

    #[error("Failed to build adapter for provider '{provider}': {source}")]
    HandleBuild {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Adapter(#[from] TransportError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Runtime credential override supplied with a switch
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// What an adapter handle was built from
#[derive(Clone, PartialEq, Eq)]
struct HandleKey {
    provider: String,
    model: String,
    api_key: String,
    base_url: String,
}

impl HandleKey {
    fn of(config: &AdapterConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[derive(Clone)]
struct Handle {
    key: HandleKey,
    adapter: Arc<dyn ProviderAdapter>,
}

#[derive(Clone)]
struct Binding {
    provider: String,
    model: String,
    credentials: Option<Credentials>,
    handle: Option<Handle>,
}

pub struct Dispatcher {
    store: Arc<ConfigStore>,
    registry: Arc<AdapterRegistry>,
    binding: RwLock<Arc<Binding>>,
    switch_lock: Mutex<()>,
}

impl Dispatcher {
    /// Bind a provider; without a model the provider's default model is used.
    /// The adapter handle is built lazily on the first request.
    pub fn new(store: Arc<ConfigStore>, registry: Arc<AdapterRegistry>, provider: &str, model: Option<&str>) -> Self {
        let model = model
            .map(str::to_string)
            .or_else(|| default_model(&store, provider))
            .unwrap_or_else(|| {
                store
                    .environment_config(None)
                    .map(|env| env.default_model)
                    .unwrap_or_default()
            });

        info!("Dispatcher bound to {}/{}", provider, model);

        Self {
            store,
            registry,
            binding: RwLock::new(Arc::new(Binding {
                provider: provider.to_string(),
                model,
                credentials: None,
                handle: None,
            })),
            switch_lock: Mutex::new(()),
        }
    }

    pub fn from_selection(store: Arc<ConfigStore>, registry: Arc<AdapterRegistry>, outcome: &SelectionOutcome) -> Self {
        Self::new(store, registry, &outcome.provider, Some(&outcome.model))
    }

    /// Bind the active environment's default provider and model
    pub fn from_environment_defaults(store: Arc<ConfigStore>, registry: Arc<AdapterRegistry>) -> Self {
        let (provider, model) = store
            .environment_config(None)
            .map(|env| (env.default_provider, env.default_model))
            .unwrap_or_else(|| ("openai".to_string(), "gpt-3.5-turbo".to_string()));
        Self::new(store, registry, &provider, Some(&model))
    }

    pub fn bound_provider(&self) -> String {
        self.binding.read().provider.clone()
    }

    pub fn bound_model(&self) -> String {
        self.binding.read().model.clone()
    }

    /// Resolve credentials for a binding against the current configuration
    fn adapter_config(
        &self,
        provider: &str,
        model: &str,
        credentials: Option<&Credentials>,
    ) -> Result<AdapterConfig, DispatchError> {
        let configured = self.store.provider_config(provider, None);
        let settings = self.store.global_settings();

        let api_key = credentials
            .and_then(|c| c.api_key.clone())
            .or_else(|| {
                configured
                    .as_ref()
                    .filter(|p| p.is_usable())
                    .map(|p| p.api_key.clone())
            })
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DispatchError::ProviderNotConfigured(provider.to_string()))?;

        let base_url = credentials
            .and_then(|c| c.base_url.clone())
            .or_else(|| configured.as_ref().map(|p| p.base_url.clone()))
            .unwrap_or_default();

        Ok(AdapterConfig {
            provider: provider.to_string(),
            model: model.to_string(),
            api_key,
            base_url,
            extra_config: configured.map(|p| p.extra_config).unwrap_or_default(),
            request_timeout: settings.request_timeout(),
        })
    }

    /// Current adapter, rebuilt when the resolved binding changed
    fn adapter(&self) -> Result<(Arc<dyn ProviderAdapter>, Arc<Binding>), DispatchError> {
        let binding = self.binding.read().clone();
        let config = self.adapter_config(&binding.provider, &binding.model, binding.credentials.as_ref())?;
        let key = HandleKey::of(&config);

        if let Some(handle) = binding.handle.as_ref().filter(|h| h.key == key) {
            return Ok((handle.adapter.clone(), binding.clone()));
        }

        debug!("Rebuilding adapter handle for {}/{}", binding.provider, binding.model);
        let adapter = self
            .registry
            .build(&config)
            .map_err(|source| DispatchError::HandleBuild {
                provider: binding.provider.clone(),
                source,
            })?;

        let mut slot = self.binding.write();
        // A concurrent switch wins over a stale rebuild
        if Arc::ptr_eq(&*slot, &binding) {
            *slot = Arc::new(Binding {
                handle: Some(Handle {
                    key,
                    adapter: adapter.clone(),
                }),
                ..(*binding).clone()
            });
        }

        Ok((adapter, binding))
    }

    fn prepare(&self, mut request: ExecutionRequest, binding: &Binding) -> ExecutionRequest {
        let settings = self.store.global_settings();
        request.temperature.get_or_insert(settings.default_temperature);
        request.max_tokens.get_or_insert(settings.default_max_tokens);
        request.model = Some(binding.model.clone());
        request
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, DispatchError> {
        let (adapter, binding) = self.adapter()?;
        let request = self.prepare(request, &binding);

        let started = Instant::now();
        let mut response = adapter.execute(&request).await?;
        response.execution_time = started.elapsed();

        if response.cost == 0.0 {
            if let Some(info) = self.store.catalog().model_info(&binding.provider, &binding.model) {
                response.cost = info.estimate_cost(response.usage.total_tokens);
            }
        }

        debug!(
            "Executed on {}/{} in {:?} ({} tokens)",
            binding.provider, binding.model, response.execution_time, response.usage.total_tokens
        );
        Ok(response)
    }

    pub fn execute_stream(&self, request: ExecutionRequest) -> Result<ChunkStream, DispatchError> {
        let (adapter, binding) = self.adapter()?;
        let request = self.prepare(request, &binding);
        Ok(adapter.execute_stream(request))
    }

    /// Rebind to another provider. The new handle is built first; on failure
    /// the previous binding keeps serving.
    pub fn switch_engine(
        &self,
        provider: &str,
        credentials: Option<Credentials>,
        model: Option<&str>,
    ) -> Result<(), DispatchError> {
        let _guard = self.switch_lock.lock();
        let previous = self.binding.read().clone();

        let result = self.build_binding(provider, credentials, model);
        match result {
            Ok(binding) => {
                info!(
                    "Switched engine: {}/{} -> {}/{}",
                    previous.provider, previous.model, binding.provider, binding.model
                );
                *self.binding.write() = Arc::new(binding);
                Ok(())
            }
            Err(source) => {
                error!(
                    "Switch to provider '{}' failed, keeping {}/{}: {}",
                    provider, previous.provider, previous.model, source
                );
                Err(DispatchError::SwitchRejected {
                    provider: provider.to_string(),
                    source,
                })
            }
        }
    }

    fn build_binding(
        &self,
        provider: &str,
        credentials: Option<Credentials>,
        model: Option<&str>,
    ) -> anyhow::Result<Binding> {
        let catalog = self.store.catalog();
        let known = catalog.provider_info(provider);

        let model = match (model, known) {
            (Some(model), Some(info)) => {
                if !info.models.contains_key(model) {
                    return Err(CatalogError::ModelNotFound {
                        provider: provider.to_string(),
                        model: model.to_string(),
                        available: info.models.keys().cloned().collect(),
                    }
                    .into());
                }
                model.to_string()
            }
            (Some(model), None) => model.to_string(),
            (None, _) => default_model(&self.store, provider)
                .ok_or_else(|| anyhow::anyhow!("No model given and provider '{}' has no default model", provider))?,
        };

        let config = self.adapter_config(provider, &model, credentials.as_ref())?;
        let adapter = self.registry.build(&config)?;

        Ok(Binding {
            provider: provider.to_string(),
            model,
            credentials,
            handle: Some(Handle {
                key: HandleKey::of(&config),
                adapter,
            }),
        })
    }

    /// Provider name -> whether a credential is configured
    pub fn available_providers(&self) -> BTreeMap<String, bool> {
        let mut providers: BTreeMap<String, bool> = self
            .registry
            .supported_providers()
            .into_iter()
            .map(|name| (name, false))
            .collect();

        if let Some(env) = self.store.environment_config(None) {
            for (name, provider) in &env.providers {
                providers.insert(name.clone(), provider.has_credential());
            }
        }

        providers
    }
}

/// Environment catalog default, then the curated default for the provider
fn default_model(store: &ConfigStore, provider: &str) -> Option<String> {
    store
        .catalog()
        .default_model(provider)
        .or_else(|| store.model_table().default_model(provider).map(str::to_string))
}
