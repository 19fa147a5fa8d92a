// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider/Model Catalog
//!
//! Immutable cross product of providers and the models they expose, built once
//! per environment per configuration load. Answers point queries for the
//! selector and the dispatcher; never mutated after construction, so a single
//! `Arc<Catalog>` is shared freely across concurrent callers.
//!
//! Validation distinguishes three failure kinds so callers can react
//! differently:
//!
//! | Error | Meaning |
//! |-------|---------|
//! | `NotConfigured` | provider unknown to this environment |
//! | `NotAvailable` | provider known but missing credentials |
//! | `ModelNotFound` | provider usable, model unknown (alternatives attached) |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::environment::EnvironmentConfig;
use super::model_table::ModelTable;

/// One model offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,

    /// Maximum context window in tokens
    pub max_tokens: u32,

    #[serde(default)]
    pub supports_vision: bool,

    /// Linear price per 1,000 tokens (USD)
    #[serde(default)]
    pub cost_per_1k_tokens: f64,

    #[serde(default)]
    pub description: String,
}

impl ModelInfo {
    pub fn new(
        name: &str,
        max_tokens: u32,
        supports_vision: bool,
        cost_per_1k_tokens: f64,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            max_tokens,
            supports_vision,
            cost_per_1k_tokens,
            description: description.to_string(),
        }
    }

    /// Check the per-model invariants (cost >= 0, max tokens > 0)
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("model name cannot be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err(format!("model '{}' must allow at least one token", self.name));
        }
        if !self.cost_per_1k_tokens.is_finite() || self.cost_per_1k_tokens < 0.0 {
            return Err(format!(
                "model '{}' has invalid cost per 1k tokens: {}",
                self.name, self.cost_per_1k_tokens
            ));
        }
        Ok(())
    }

    /// Linear cost estimate for a token count
    pub fn estimate_cost(&self, tokens: u32) -> f64 {
        f64::from(tokens) / 1000.0 * self.cost_per_1k_tokens
    }
}

/// One backend provider as seen by a single environment
#[derive(Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub api_key: String,
    pub base_url: String,

    /// Model name -> metadata, in declaration order
    pub models: IndexMap<String, ModelInfo>,

    /// True only when the required credential fields are non-empty
    pub is_available: bool,

    /// Provider-specific settings (org id, region, secret key, ...)
    pub extra_config: IndexMap<String, serde_json::Value>,
}

impl ProviderInfo {
    pub fn new(name: &str, api_key: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            models: IndexMap::new(),
            is_available: !api_key.trim().is_empty(),
            extra_config: IndexMap::new(),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Available and carrying a credential
    pub fn is_usable(&self) -> bool {
        self.is_available && self.has_credential()
    }
}

// Credentials never reach logs through Debug.
impl std::fmt::Debug for ProviderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderInfo")
            .field("name", &self.name)
            .field("api_key", &if self.has_credential() { "***" } else { "" })
            .field("base_url", &self.base_url)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("is_available", &self.is_available)
            .finish()
    }
}

/// Validation failures for a (provider, model) pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Provider '{0}' not configured")]
    NotConfigured(String),

    #[error("Provider '{0}' is not available")]
    NotAvailable(String),

    #[error("Model '{model}' not available for provider '{provider}'. Available models: {available:?}")]
    ModelNotFound {
        provider: String,
        model: String,
        available: Vec<String>,
    },
}

/// Per-provider summary used by model listing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub models: Vec<String>,

    /// Cheapest model offered by the provider
    pub default_model: Option<String>,

    pub pricing: IndexMap<String, f64>,
}

/// Read-only provider x model catalog for one environment
#[derive(Debug, Clone)]
pub struct Catalog {
    environment: String,
    providers: IndexMap<String, ProviderInfo>,
    table: Arc<ModelTable>,
}

impl Catalog {
    /// Build the catalog for an environment.
    ///
    /// Each provider exposes the curated models for its name, overlaid with any
    /// models the environment declares for it.
    pub fn build(environment: &EnvironmentConfig, table: Arc<ModelTable>) -> Self {
        let providers = environment
            .providers
            .iter()
            .map(|(name, provider)| {
                let mut resolved = provider.clone();
                let mut models = table.models_for(name).cloned().unwrap_or_default();
                for (model_name, info) in &provider.models {
                    models.insert(model_name.clone(), info.clone());
                }
                resolved.models = models;
                (name.clone(), resolved)
            })
            .collect();

        Self {
            environment: environment.name.clone(),
            providers,
            table,
        }
    }

    /// Name of the environment this catalog was built from
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn provider_info(&self, provider: &str) -> Option<&ProviderInfo> {
        self.providers.get(provider)
    }

    pub fn model_info(&self, provider: &str, model: &str) -> Option<&ModelInfo> {
        self.providers.get(provider)?.models.get(model)
    }

    /// Available providers in insertion order
    pub fn available_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_available)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Model names per available provider, optionally for a single provider
    pub fn available_models(&self, provider: Option<&str>) -> IndexMap<String, Vec<String>> {
        self.providers
            .iter()
            .filter(|(name, p)| p.is_available && provider.map_or(true, |wanted| wanted == name.as_str()))
            .map(|(name, p)| (name.clone(), p.models.keys().cloned().collect()))
            .collect()
    }

    /// Validate that a (provider, model) pair can serve requests
    pub fn validate(&self, provider: &str, model: &str) -> Result<(), CatalogError> {
        let info = self
            .providers
            .get(provider)
            .ok_or_else(|| CatalogError::NotConfigured(provider.to_string()))?;

        if !info.is_available {
            return Err(CatalogError::NotAvailable(provider.to_string()));
        }

        if !info.models.contains_key(model) {
            return Err(CatalogError::ModelNotFound {
                provider: provider.to_string(),
                model: model.to_string(),
                available: info.models.keys().cloned().collect(),
            });
        }

        Ok(())
    }

    /// Benchmark score in [0, 100]
    pub fn performance_score(&self, provider: &str, model: &str) -> f64 {
        self.table.performance_score(provider, model)
    }

    /// Reliability prior in [0, 100]
    pub fn availability_score(&self, provider: &str) -> f64 {
        self.table.availability_score(provider)
    }

    /// Curated default model for a provider, falling back to its first model
    pub fn default_model(&self, provider: &str) -> Option<String> {
        let models = &self.providers.get(provider)?.models;
        self.table
            .default_model(provider)
            .filter(|m| models.contains_key(*m))
            .map(str::to_string)
            .or_else(|| models.keys().next().cloned())
    }

    pub fn provider_summaries(&self) -> Vec<ProviderSummary> {
        self.providers
            .values()
            .filter(|p| p.is_available)
            .map(|p| ProviderSummary {
                name: p.name.clone(),
                models: p.models.keys().cloned().collect(),
                default_model: p
                    .models
                    .iter()
                    .min_by(|a, b| a.1.cost_per_1k_tokens.total_cmp(&b.1.cost_per_1k_tokens))
                    .map(|(name, _)| name.clone()),
                pricing: p
                    .models
                    .iter()
                    .map(|(name, m)| (name.clone(), m.cost_per_1k_tokens))
                    .collect(),
            })
            .collect()
    }

    /// Full model metadata for every available provider
    pub fn models_info(&self) -> IndexMap<String, IndexMap<String, ModelInfo>> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_available)
            .map(|(name, p)| (name.clone(), p.models.clone()))
            .collect()
    }

    /// Total number of models across available providers
    pub fn model_count(&self) -> usize {
        self.providers
            .values()
            .filter(|p| p.is_available)
            .map(|p| p.models.len())
            .sum()
    }
}
