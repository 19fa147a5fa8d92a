// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Curated Model Table
//
// Static model metadata, benchmark scores and provider reliability priors.
// Maintained by hand; environments can only add to or override the model
// list, never the scores.

use indexmap::IndexMap;
use std::collections::HashMap;

use super::catalog::ModelInfo;

/// Score used for pairs missing from the curated tables
pub const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Default)]
pub struct ModelTable {
    models: IndexMap<String, IndexMap<String, ModelInfo>>,
    performance: HashMap<String, HashMap<String, f64>>,
    availability: HashMap<String, f64>,
    default_models: HashMap<String, String>,
}

impl ModelTable {
    /// Empty table; every lookup falls back to neutral scores
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a model with its benchmark score
    pub fn with_model(mut self, provider: &str, info: ModelInfo, performance: f64) -> Self {
        self.performance
            .entry(provider.to_string())
            .or_default()
            .insert(info.name.clone(), performance);
        self.models
            .entry(provider.to_string())
            .or_default()
            .insert(info.name.clone(), info);
        self
    }

    pub fn with_availability(mut self, provider: &str, score: f64) -> Self {
        self.availability.insert(provider.to_string(), score);
        self
    }

    pub fn with_default_model(mut self, provider: &str, model: &str) -> Self {
        self.default_models.insert(provider.to_string(), model.to_string());
        self
    }

    pub fn models_for(&self, provider: &str) -> Option<&IndexMap<String, ModelInfo>> {
        self.models.get(provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn performance_score(&self, provider: &str, model: &str) -> f64 {
        self.performance
            .get(provider)
            .and_then(|models| models.get(model))
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    pub fn availability_score(&self, provider: &str) -> f64 {
        self.availability.get(provider).copied().unwrap_or(NEUTRAL_SCORE)
    }

    pub fn default_model(&self, provider: &str) -> Option<&str> {
        self.default_models.get(provider).map(String::as_str)
    }

    /// The built-in catalog of supported providers and models
    pub fn builtin() -> Self {
        Self::empty()
            // OpenAI
            .with_model("openai", ModelInfo::new("gpt-4", 8192, true, 0.03, "GPT-4 flagship model"), 95.0)
            .with_model("openai", ModelInfo::new("gpt-4-turbo", 128_000, true, 0.01, "GPT-4 Turbo high-throughput variant"), 92.0)
            .with_model("openai", ModelInfo::new("gpt-4o", 128_000, true, 0.005, "GPT-4o optimized model"), 90.0)
            .with_model("openai", ModelInfo::new("gpt-4o-mini", 128_000, true, 0.0001, "GPT-4o Mini lightweight model"), 75.0)
            .with_model("openai", ModelInfo::new("gpt-3.5-turbo", 4096, false, 0.001, "GPT-3.5 Turbo economical model"), 70.0)
            // DeepSeek
            .with_model("deepseek", ModelInfo::new("deepseek-chat", 32_768, false, 0.00014, "DeepSeek general chat model"), 80.0)
            .with_model("deepseek", ModelInfo::new("deepseek-reasoner", 8192, false, 0.00055, "DeepSeek reasoning model"), 85.0)
            // Anthropic
            .with_model("anthropic", ModelInfo::new("claude-3-opus-20240229", 200_000, true, 0.015, "Claude 3 Opus"), 93.0)
            .with_model("anthropic", ModelInfo::new("claude-3-sonnet-20240229", 200_000, true, 0.003, "Claude 3 Sonnet"), 88.0)
            .with_model("anthropic", ModelInfo::new("claude-3-5-sonnet-20241022", 200_000, true, 0.003, "Claude 3.5 Sonnet"), 90.0)
            .with_model("anthropic", ModelInfo::new("claude-3-haiku-20240307", 200_000, true, 0.00025, "Claude 3 Haiku"), 82.0)
            // Qwen
            .with_model("qwen", ModelInfo::new("qwen-turbo", 8192, false, 0.0008, "Qwen Turbo"), 72.0)
            .with_model("qwen", ModelInfo::new("qwen-plus", 32_768, false, 0.002, "Qwen Plus"), 78.0)
            .with_model("qwen", ModelInfo::new("qwen-max", 8192, false, 0.02, "Qwen Max"), 85.0)
            .with_model("qwen", ModelInfo::new("qwen-max-longcontext", 30_000, false, 0.02, "Qwen Max long context"), 83.0)
            // Ernie
            .with_model("ernie", ModelInfo::new("ernie-bot-turbo", 8192, false, 0.0008, "ERNIE Bot Turbo"), 70.0)
            .with_model("ernie", ModelInfo::new("ernie-bot", 8192, false, 0.0012, "ERNIE Bot"), 73.0)
            .with_model("ernie", ModelInfo::new("ernie-bot-4", 8192, false, 0.012, "ERNIE Bot 4.0"), 80.0)
            .with_model("ernie", ModelInfo::new("ernie-speed", 8192, false, 0.0004, "ERNIE Speed"), 65.0)
            // ChatGLM
            .with_model("chatglm", ModelInfo::new("glm-4", 8192, false, 0.01, "GLM-4"), 78.0)
            .with_model("chatglm", ModelInfo::new("glm-4v", 8192, true, 0.01, "GLM-4V vision model"), 76.0)
            .with_model("chatglm", ModelInfo::new("glm-3-turbo", 8192, false, 0.0005, "GLM-3 Turbo"), 68.0)
            // Reliability priors
            .with_availability("openai", 95.0)
            .with_availability("anthropic", 90.0)
            .with_availability("deepseek", 85.0)
            .with_availability("qwen", 80.0)
            .with_availability("ernie", 75.0)
            .with_availability("chatglm", 70.0)
            // Models bound when a provider is chosen without a model
            .with_default_model("openai", "gpt-4")
            .with_default_model("deepseek", "deepseek-chat")
            .with_default_model("anthropic", "claude-3-sonnet-20240229")
            .with_default_model("qwen", "qwen-turbo")
            .with_default_model("ernie", "ernie-bot-turbo")
            .with_default_model("chatglm", "glm-4")
    }
}
