// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credentials
//!
//! Builds the implicit `default` environment from namespaced credential
//! variables (`LLM_PROVIDERS_<PROVIDER>_<FIELD>`).
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Env-var credential source for the configuration store

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::catalog::ProviderInfo;
use crate::domain::environment::{EnvironmentConfig, DEFAULT_ENVIRONMENT};

const VAR_PREFIX: &str = "LLM_PROVIDERS_";
const ENGINE_TYPE_VAR: &str = "LLM_ENGINE_TYPE";
const MODEL_VAR: &str = "LLM_MODEL";

/// Read-only view over credential variables
pub trait CredentialSource: Send + Sync + 'static {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl CredentialSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed variable map, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct StaticEnv(pub HashMap<String, String>);

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }
}

impl CredentialSource for StaticEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// How one provider is described by credential variables
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub default_base_url: &'static str,

    /// Fields besides API_KEY that must be non-empty for availability
    pub required_extra: &'static [&'static str],

    /// Optional extra fields and their defaults
    pub optional_extra: &'static [(&'static str, &'static str)],
}

pub const PROVIDER_SPECS: [ProviderSpec; 6] = [
    ProviderSpec {
        name: "openai",
        default_base_url: "https://api.openai.com/v1",
        required_extra: &[],
        optional_extra: &[("org_id", "")],
    },
    ProviderSpec {
        name: "deepseek",
        default_base_url: "https://api.deepseek.com",
        required_extra: &[],
        optional_extra: &[],
    },
    ProviderSpec {
        name: "anthropic",
        default_base_url: "https://api.anthropic.com",
        required_extra: &[],
        optional_extra: &[],
    },
    ProviderSpec {
        name: "qwen",
        default_base_url: "https://dashscope.aliyuncs.com/api/v1",
        required_extra: &[],
        optional_extra: &[("region", "cn-hangzhou"), ("workspace", "")],
    },
    ProviderSpec {
        name: "ernie",
        default_base_url: "https://aip.baidubce.com",
        required_extra: &["secret_key"],
        optional_extra: &[],
    },
    ProviderSpec {
        name: "chatglm",
        default_base_url: "https://open.bigmodel.cn/api/paas/v4",
        required_extra: &[],
        optional_extra: &[],
    },
];

fn var_name(provider: &str, field: &str) -> String {
    format!(
        "{}{}_{}",
        VAR_PREFIX,
        provider.to_ascii_uppercase(),
        field.to_ascii_uppercase()
    )
}

fn non_empty(source: &dyn CredentialSource, name: &str) -> Option<String> {
    source.var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProviderSpec {
    /// Resolve the provider from credential variables.
    ///
    /// Returns `None` when no credential field is set at all. A provider with
    /// some but not all required fields is returned flagged unavailable.
    pub fn resolve(&self, source: &dyn CredentialSource) -> Option<ProviderInfo> {
        let api_key = non_empty(source, &var_name(self.name, "api_key"));
        let required: Vec<(&str, Option<String>)> = self
            .required_extra
            .iter()
            .map(|field| (*field, non_empty(source, &var_name(self.name, field))))
            .collect();

        if api_key.is_none() && required.iter().all(|(_, v)| v.is_none()) {
            return None;
        }

        let base_url = non_empty(source, &var_name(self.name, "base_url"))
            .unwrap_or_else(|| self.default_base_url.to_string());

        let mut provider = ProviderInfo::new(self.name, api_key.as_deref().unwrap_or(""), &base_url);
        provider.is_available = api_key.is_some() && required.iter().all(|(_, v)| v.is_some());

        let mut extra = IndexMap::new();
        for (field, value) in required {
            extra.insert(field.to_string(), Value::String(value.unwrap_or_default()));
        }
        for (field, default) in self.optional_extra {
            let value = non_empty(source, &var_name(self.name, field)).unwrap_or_else(|| default.to_string());
            extra.insert(field.to_string(), Value::String(value));
        }
        provider.extra_config = extra;

        Some(provider)
    }
}

/// Build the implicit `default` environment, or `None` when no provider has
/// any credential set.
pub fn load_base_environment(source: &dyn CredentialSource) -> Option<EnvironmentConfig> {
    let mut env = EnvironmentConfig::new(DEFAULT_ENVIRONMENT, "Default environment from environment variables");

    for spec in PROVIDER_SPECS.iter() {
        if let Some(provider) = spec.resolve(source) {
            debug!("Credential variables found for provider: {} (available: {})", spec.name, provider.is_available);
            env.providers.insert(spec.name.to_string(), provider);
        }
    }

    if env.providers.is_empty() {
        return None;
    }

    if let Some(engine) = non_empty(source, ENGINE_TYPE_VAR) {
        env.default_provider = engine;
    }
    if let Some(model) = non_empty(source, MODEL_VAR) {
        env.default_model = model;
    }

    Some(env)
}
