// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Environment
//!
//! Named, isolated configuration scopes ("default", "staging", "prod", ...)
//! and the process-wide settings that apply to all of them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Environment aggregate, validation and redacted export shape

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::catalog::ProviderInfo;

/// Placeholder written instead of any credential on export
pub const MASKED_PLACEHOLDER: &str = "***MASKED***";

/// Name of the implicit environment built from credential variables
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Extra config keys whose values are credentials
const SENSITIVE_KEY_MARKERS: [&str; 4] = ["secret", "key", "token", "password"];

/// A named configuration scope
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub description: String,

    /// Provider name -> provider, in declaration order
    pub providers: IndexMap<String, ProviderInfo>,

    pub default_provider: String,
    pub default_model: String,

    /// Requests per minute per provider
    pub rate_limits: IndexMap<String, u32>,

    /// Spend ceiling per provider (USD)
    pub cost_limits: IndexMap<String, f64>,

    /// False only for the synthesized placeholder environment
    pub usable: bool,
}

impl EnvironmentConfig {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            providers: IndexMap::new(),
            default_provider: "openai".to_string(),
            default_model: "gpt-3.5-turbo".to_string(),
            rate_limits: IndexMap::new(),
            cost_limits: IndexMap::new(),
            usable: true,
        }
    }

    /// Placeholder used when no configuration source produced anything
    pub fn unusable_fallback() -> Self {
        Self {
            usable: false,
            ..Self::new(DEFAULT_ENVIRONMENT, "Default fallback environment")
        }
    }

    /// Providers that are flagged available and carry a credential
    pub fn usable_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_usable())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Providers flagged available, in declaration order
    pub fn available_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|(_, p)| p.is_available)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Check that the environment can actually serve requests
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        if self.providers.is_empty() {
            return Err(EnvironmentError::NoProviders(self.name.clone()));
        }

        let usable = self.usable_providers();
        if usable.is_empty() {
            return Err(EnvironmentError::NoAvailableProviders(self.name.clone()));
        }

        if !usable.contains(&self.default_provider.as_str()) {
            return Err(EnvironmentError::DefaultProviderUnavailable {
                environment: self.name.clone(),
                provider: self.default_provider.clone(),
            });
        }

        Ok(())
    }

    pub fn stats(&self) -> EnvironmentStats {
        EnvironmentStats {
            name: self.name.clone(),
            description: self.description.clone(),
            total_providers: self.providers.len(),
            available_providers: self.providers.values().filter(|p| p.is_available).count(),
            default_provider: self.default_provider.clone(),
            default_model: self.default_model.clone(),
            has_rate_limits: !self.rate_limits.is_empty(),
            has_cost_limits: !self.cost_limits.is_empty(),
        }
    }

    /// Export shape with every credential replaced by [`MASKED_PLACEHOLDER`]
    pub fn redacted(&self) -> RedactedEnvironment {
        RedactedEnvironment {
            name: self.name.clone(),
            description: self.description.clone(),
            default_provider: self.default_provider.clone(),
            default_model: self.default_model.clone(),
            providers: self
                .providers
                .iter()
                .map(|(name, p)| {
                    (
                        name.clone(),
                        RedactedProvider {
                            name: p.name.clone(),
                            api_key: MASKED_PLACEHOLDER.to_string(),
                            base_url: p.base_url.clone(),
                            is_available: p.is_available,
                            extra_config: p
                                .extra_config
                                .iter()
                                .map(|(k, v)| (k.clone(), redact_extra(k, v)))
                                .collect(),
                        },
                    )
                })
                .collect(),
            rate_limits: self.rate_limits.clone(),
            cost_limits: self.cost_limits.clone(),
        }
    }
}

fn redact_extra(key: &str, value: &serde_json::Value) -> serde_json::Value {
    let lowered = key.to_ascii_lowercase();
    if SENSITIVE_KEY_MARKERS.iter().any(|m| lowered.contains(m)) {
        serde_json::Value::String(MASKED_PLACEHOLDER.to_string())
    } else {
        value.clone()
    }
}

/// Environment-level validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Environment '{0}' not found")]
    EnvUnknown(String),

    #[error("No providers configured for environment '{0}'")]
    NoProviders(String),

    #[error("No available providers in environment '{0}'")]
    NoAvailableProviders(String),

    #[error("Default provider '{provider}' is not available in environment '{environment}'")]
    DefaultProviderUnavailable { environment: String, provider: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentStats {
    pub name: String,
    pub description: String,
    pub total_providers: usize,
    pub available_providers: usize,
    pub default_provider: String,
    pub default_model: String,
    pub has_rate_limits: bool,
    pub has_cost_limits: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactedEnvironment {
    pub name: String,
    pub description: String,
    pub default_provider: String,
    pub default_model: String,
    pub providers: IndexMap<String, RedactedProvider>,
    pub rate_limits: IndexMap<String, u32>,
    pub cost_limits: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactedProvider {
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub is_available: bool,
    pub extra_config: IndexMap<String, serde_json::Value>,
}

/// Process-wide defaults independent of environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub default_temperature: f32,
    pub default_max_tokens: u32,

    /// Seconds
    pub request_timeout: u64,

    pub retry_attempts: u32,

    /// Seconds between retries
    pub retry_delay: f64,

    pub enable_caching: bool,

    /// Seconds
    pub cache_ttl: u64,

    pub log_level: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_temperature: 0.7,
            default_max_tokens: 2000,
            request_timeout: 60,
            retry_attempts: 3,
            retry_delay: 1.0,
            enable_caching: true,
            cache_ttl: 3600,
            log_level: "INFO".to_string(),
        }
    }
}

impl GlobalSettings {
    /// All numeric fields must be strictly positive
    pub fn validate(&self) -> Result<(), String> {
        if !(self.default_temperature.is_finite() && self.default_temperature > 0.0) {
            return Err(format!("default_temperature must be > 0, got {}", self.default_temperature));
        }
        if self.default_max_tokens == 0 {
            return Err("default_max_tokens must be > 0".to_string());
        }
        if self.request_timeout == 0 {
            return Err("request_timeout must be > 0".to_string());
        }
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be > 0".to_string());
        }
        if !(self.retry_delay.is_finite() && self.retry_delay > 0.0) {
            return Err(format!("retry_delay must be > 0, got {}", self.retry_delay));
        }
        if self.cache_ttl == 0 {
            return Err("cache_ttl must be > 0".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
