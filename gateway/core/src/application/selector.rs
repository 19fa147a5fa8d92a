// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selector
//!
//! Chooses a (provider, model) pair for a request. Selection is a pure
//! function of the requirements and one catalog snapshot: identical inputs
//! always produce the identical outcome.
//!
//! Score of a candidate:
//!
//! ```text
//! cost_score = max(0, (ref - cost) / ref * 100)
//! score      = cost_score * w_cost + performance * w_perf
//!            + availability * w_avail + preference_bonus
//! ```
//!
//! When nothing survives the requirements filter the fixed fallback chain is
//! walked, then the first model of the first available provider is used.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Model selection, recommendations and suitability analysis

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::catalog::{Catalog, ModelInfo};
use crate::domain::selection::{
    ModelCandidate, ModelRequirements, PriorityMode, SelectionKind, SelectionOutcome, SuitabilityDetails,
    SuitabilityReport, VisionRequirement,
};
use crate::infrastructure::config_store::ConfigStore;

/// Context windows above this earn a "long context" note
const LONG_CONTEXT_TOKENS: u32 = 32_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No LLM model is available")]
    NoCandidateAvailable,

    #[error("Invalid model requirements: {0}")]
    InvalidRequirements(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub cost: f64,
    pub performance: f64,
    pub availability: f64,
}

impl ScoreWeights {
    pub const fn new(cost: f64, performance: f64, availability: f64) -> Self {
        Self {
            cost,
            performance,
            availability,
        }
    }
}

/// Tunables of the scoring function and the fallback chain
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub cost_weights: ScoreWeights,
    pub performance_weights: ScoreWeights,
    pub balanced_weights: ScoreWeights,

    /// Price per 1K tokens that maps to a cost score of zero
    pub cost_reference: f64,

    /// Added to the score of preferred providers
    pub preference_bonus: f64,

    /// Pairs tried in order when no candidate survives the filter
    pub fallback_chain: Vec<(String, String)>,

    pub recommendation_limit: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        let chain = [
            ("openai", "gpt-3.5-turbo"),
            ("openai", "gpt-4o-mini"),
            ("anthropic", "claude-3-haiku-20240307"),
            ("deepseek", "deepseek-chat"),
            ("qwen", "qwen-turbo"),
            ("ernie", "ernie-speed"),
            ("chatglm", "glm-3-turbo"),
        ];

        Self {
            cost_weights: ScoreWeights::new(0.7, 0.2, 0.1),
            performance_weights: ScoreWeights::new(0.2, 0.7, 0.1),
            balanced_weights: ScoreWeights::new(0.4, 0.4, 0.2),
            cost_reference: 0.1,
            preference_bonus: 10.0,
            fallback_chain: chain
                .iter()
                .map(|(p, m)| (p.to_string(), m.to_string()))
                .collect(),
            recommendation_limit: 5,
        }
    }
}

impl SelectionPolicy {
    pub fn weights(&self, mode: PriorityMode) -> ScoreWeights {
        match mode {
            PriorityMode::Cost => self.cost_weights,
            PriorityMode::Performance => self.performance_weights,
            PriorityMode::Balanced => self.balanced_weights,
        }
    }

    pub fn with_fallback_chain(mut self, chain: Vec<(String, String)>) -> Self {
        self.fallback_chain = chain;
        self
    }

    pub fn with_cost_reference(mut self, reference: f64) -> Self {
        self.cost_reference = reference;
        self
    }
}

pub struct ModelSelector {
    store: Arc<ConfigStore>,
    policy: SelectionPolicy,
}

impl ModelSelector {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Select a pair against the active environment
    pub fn select_best_model(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
        requirements: &ModelRequirements,
    ) -> Result<SelectionOutcome, SelectionError> {
        let catalog = self.store.catalog();
        self.select_from(&catalog, provider, model, requirements)
    }

    /// Select a pair from an explicit catalog snapshot
    pub fn select_from(
        &self,
        catalog: &Catalog,
        provider: Option<&str>,
        model: Option<&str>,
        requirements: &ModelRequirements,
    ) -> Result<SelectionOutcome, SelectionError> {
        requirements
            .validate()
            .map_err(SelectionError::InvalidRequirements)?;

        if let (Some(provider), Some(model)) = (provider, model) {
            match catalog.validate(provider, model) {
                Ok(()) => {
                    let meets = catalog
                        .model_info(provider, model)
                        .is_some_and(|info| meets_requirements(provider, info, requirements));
                    if meets {
                        info!("Using explicit model: {}/{}", provider, model);
                        return Ok(SelectionOutcome {
                            provider: provider.to_string(),
                            model: model.to_string(),
                            reason: format!("explicit: {}/{}", provider, model),
                            kind: SelectionKind::Explicit,
                            score: None,
                            candidates: 0,
                        });
                    }
                    warn!(
                        "Explicit model {}/{} does not meet requirements, selecting automatically",
                        provider, model
                    );
                }
                Err(e) => warn!("Explicit model rejected ({}), selecting automatically", e),
            }
        }

        let candidates = self.candidates(catalog, requirements);

        let mut best: Option<&ModelCandidate> = None;
        for candidate in &candidates {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) => {
                info!(
                    "Selected model {}/{} (score {:.2}, {} candidates)",
                    best.provider,
                    best.model,
                    best.score,
                    candidates.len()
                );
                Ok(SelectionOutcome {
                    provider: best.provider.clone(),
                    model: best.model.clone(),
                    reason: best.reason.clone(),
                    kind: SelectionKind::Scored,
                    score: Some(best.score),
                    candidates: candidates.len(),
                })
            }
            None => self.fallback(catalog),
        }
    }

    fn fallback(&self, catalog: &Catalog) -> Result<SelectionOutcome, SelectionError> {
        for (provider, model) in &self.policy.fallback_chain {
            if catalog.validate(provider, model).is_ok() {
                warn!("No model meets requirements, using fallback model: {}/{}", provider, model);
                return Ok(SelectionOutcome {
                    provider: provider.clone(),
                    model: model.clone(),
                    reason: format!("fallback: {}/{}", provider, model),
                    kind: SelectionKind::Fallback,
                    score: None,
                    candidates: 0,
                });
            }
        }

        let last_resort = catalog
            .available_models(None)
            .into_iter()
            .find_map(|(provider, models)| models.into_iter().next().map(|model| (provider, model)));

        match last_resort {
            Some((provider, model)) => {
                warn!("Fallback chain exhausted, using last resort model: {}/{}", provider, model);
                Ok(SelectionOutcome {
                    reason: format!("last resort: {}/{}", provider, model),
                    provider,
                    model,
                    kind: SelectionKind::LastResort,
                    score: None,
                    candidates: 0,
                })
            }
            None => Err(SelectionError::NoCandidateAvailable),
        }
    }

    /// Every available pair that survives the requirements filter, scored,
    /// in catalog order
    pub fn candidates(&self, catalog: &Catalog, requirements: &ModelRequirements) -> Vec<ModelCandidate> {
        let mut candidates = Vec::new();

        for provider in catalog.available_providers() {
            if requirements.is_excluded(&provider) {
                continue;
            }
            let Some(info) = catalog.provider_info(&provider) else {
                continue;
            };

            for (model, model_info) in &info.models {
                if !meets_requirements(&provider, model_info, requirements) {
                    continue;
                }
                let score = self.score(catalog, &provider, model, model_info, requirements);
                debug!("Candidate {}/{} scored {:.2}", provider, model, score);
                candidates.push(ModelCandidate {
                    provider: provider.clone(),
                    model: model.clone(),
                    info: model_info.clone(),
                    score,
                    reason: self.reason(catalog, &provider, model, model_info, requirements),
                });
            }
        }

        candidates
    }

    /// Weighted score of a catalog pair; `model` is the catalog key
    pub fn score(
        &self,
        catalog: &Catalog,
        provider: &str,
        model: &str,
        info: &ModelInfo,
        requirements: &ModelRequirements,
    ) -> f64 {
        let weights = self.policy.weights(requirements.priority);
        let reference = self.policy.cost_reference;

        let cost_score = if reference > 0.0 {
            ((reference - info.cost_per_1k_tokens) / reference * 100.0).max(0.0)
        } else {
            0.0
        };
        let performance = catalog.performance_score(provider, model);
        let availability = catalog.availability_score(provider);
        let bonus = if requirements.is_preferred(provider) {
            self.policy.preference_bonus
        } else {
            0.0
        };

        cost_score * weights.cost + performance * weights.performance + availability * weights.availability + bonus
    }

    /// Human-readable justification, identical for live selection and analysis
    pub fn reason(
        &self,
        catalog: &Catalog,
        provider: &str,
        model: &str,
        info: &ModelInfo,
        requirements: &ModelRequirements,
    ) -> String {
        let mut parts = vec![match requirements.priority {
            PriorityMode::Cost => format!("cost-optimized (${:.4}/1k tokens)", info.cost_per_1k_tokens),
            PriorityMode::Performance => {
                format!("performance-first (score: {})", catalog.performance_score(provider, model))
            }
            PriorityMode::Balanced => format!(
                "balanced (cost: ${:.4}, strong performance)",
                info.cost_per_1k_tokens
            ),
        }];

        if info.supports_vision && requirements.vision == VisionRequirement::Required {
            parts.push("vision support".to_string());
        }
        if info.max_tokens > LONG_CONTEXT_TOKENS {
            parts.push("long context".to_string());
        }

        parts.join(", ")
    }

    /// Top candidates by score, descending; ties keep catalog order
    pub fn recommendations(&self, requirements: &ModelRequirements) -> Result<Vec<ModelCandidate>, SelectionError> {
        let catalog = self.store.catalog();
        self.recommend_from(&catalog, requirements)
    }

    pub fn recommend_from(
        &self,
        catalog: &Catalog,
        requirements: &ModelRequirements,
    ) -> Result<Vec<ModelCandidate>, SelectionError> {
        requirements
            .validate()
            .map_err(SelectionError::InvalidRequirements)?;

        let mut candidates = self.candidates(catalog, requirements);
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.policy.recommendation_limit);
        Ok(candidates)
    }

    pub fn analyze_suitability(
        &self,
        provider: &str,
        model: &str,
        requirements: &ModelRequirements,
    ) -> SuitabilityReport {
        let catalog = self.store.catalog();
        self.analyze_from(&catalog, provider, model, requirements)
    }

    pub fn analyze_from(
        &self,
        catalog: &Catalog,
        provider: &str,
        model: &str,
        requirements: &ModelRequirements,
    ) -> SuitabilityReport {
        let info = match catalog.validate(provider, model) {
            Ok(()) => catalog.model_info(provider, model),
            Err(e) => {
                return SuitabilityReport {
                    provider: provider.to_string(),
                    model: model.to_string(),
                    suitable: false,
                    validation_error: Some(e.to_string()),
                    score: 0.0,
                    reason: e.to_string(),
                    details: None,
                };
            }
        };

        let Some(info) = info else {
            return SuitabilityReport {
                provider: provider.to_string(),
                model: model.to_string(),
                suitable: false,
                validation_error: Some(format!("Model '{}' not found", model)),
                score: 0.0,
                reason: format!("Model '{}' not found", model),
                details: None,
            };
        };

        SuitabilityReport {
            provider: provider.to_string(),
            model: model.to_string(),
            suitable: requirements.validate().is_ok() && meets_requirements(provider, info, requirements),
            validation_error: None,
            score: self.score(catalog, provider, model, info, requirements),
            reason: self.reason(catalog, provider, model, info, requirements),
            details: Some(SuitabilityDetails {
                cost_per_1k_tokens: info.cost_per_1k_tokens,
                max_tokens: info.max_tokens,
                supports_vision: info.supports_vision,
                performance_score: catalog.performance_score(provider, model),
                description: info.description.clone(),
            }),
        }
    }
}

fn meets_requirements(provider: &str, info: &ModelInfo, requirements: &ModelRequirements) -> bool {
    !requirements.is_excluded(provider) && requirements.admits(provider, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::ProviderInfo;
    use crate::domain::environment::EnvironmentConfig;
    use crate::domain::model_table::ModelTable;

    fn selector() -> ModelSelector {
        let store = ConfigStore::with_components(
            crate::infrastructure::ConfigStoreOptions::new("/nonexistent/modelgate"),
            Arc::new(crate::infrastructure::ManualClock::new()),
            Arc::new(crate::infrastructure::StaticEnv::new()),
            Arc::new(ModelTable::builtin()),
        );
        ModelSelector::new(Arc::new(store))
    }

    /// Two providers, one model each: A cheap and weaker, B pricier and stronger
    fn two_model_catalog() -> Catalog {
        let table = ModelTable::empty()
            .with_model("a", ModelInfo::new("a-1", 8192, false, 0.001, ""), 70.0)
            .with_model("b", ModelInfo::new("b-1", 8192, false, 0.01, ""), 95.0)
            .with_availability("a", 90.0)
            .with_availability("b", 95.0);

        let mut env = EnvironmentConfig::new("test", "");
        env.providers.insert("a".into(), ProviderInfo::new("a", "key-a", ""));
        env.providers.insert("b".into(), ProviderInfo::new("b", "key-b", ""));
        Catalog::build(&env, Arc::new(table))
    }

    #[test]
    fn test_balanced_scores() {
        let selector = selector();
        let catalog = two_model_catalog();
        let req = ModelRequirements::default();

        let a = selector.score(&catalog, "a", "a-1", catalog.model_info("a", "a-1").unwrap(), &req);
        let b = selector.score(&catalog, "b", "b-1", catalog.model_info("b", "b-1").unwrap(), &req);
        assert!((a - 85.6).abs() < 1e-9, "a = {}", a);
        assert!((b - 93.0).abs() < 1e-9, "b = {}", b);

        let outcome = selector.select_from(&catalog, None, None, &req).unwrap();
        assert_eq!((outcome.provider.as_str(), outcome.model.as_str()), ("b", "b-1"));
        assert_eq!(outcome.kind, SelectionKind::Scored);
        assert_eq!(outcome.candidates, 2);
    }

    #[test]
    fn test_cost_priority_prefers_cheap_model() {
        let selector = selector();
        let catalog = two_model_catalog();
        let req = ModelRequirements::default().with_priority(PriorityMode::Cost);
        // a: 99*0.7 + 70*0.2 + 90*0.1 = 92.3, b: 90*0.7 + 95*0.2 + 95*0.1 = 91.5
        let outcome = selector.select_from(&catalog, None, None, &req).unwrap();
        assert_eq!(outcome.provider, "a");
        assert!(outcome.reason.starts_with("cost-optimized ($0.0010/1k tokens)"));
    }

    #[test]
    fn test_ties_resolve_to_first_in_catalog_order() {
        let table = ModelTable::empty()
            .with_model("x", ModelInfo::new("same", 4096, false, 0.002, ""), 80.0)
            .with_model("y", ModelInfo::new("same", 4096, false, 0.002, ""), 80.0);
        let mut env = EnvironmentConfig::new("tie", "");
        env.providers.insert("y".into(), ProviderInfo::new("y", "k", ""));
        env.providers.insert("x".into(), ProviderInfo::new("x", "k", ""));
        let catalog = Catalog::build(&env, Arc::new(table));

        let outcome = selector()
            .select_from(&catalog, None, None, &ModelRequirements::default())
            .unwrap();
        assert_eq!(outcome.provider, "y");
    }

    #[test]
    fn test_preference_bonus() {
        let selector = selector();
        let catalog = two_model_catalog();
        let req = ModelRequirements::default().prefer("a");
        let info = catalog.model_info("a", "a-1").unwrap();
        assert!((selector.score(&catalog, "a", "a-1", info, &req) - 95.6).abs() < 1e-9);
    }

    #[test]
    fn test_costs_above_reference_clamp_to_zero() {
        let selector = selector();
        let catalog = two_model_catalog();
        let expensive = ModelInfo::new("a-1", 8192, false, 0.5, "");
        let req = ModelRequirements::default().with_priority(PriorityMode::Cost);
        // cost score clamps to 0: 70*0.2 + 90*0.1
        assert!((selector.score(&catalog, "a", "a-1", &expensive, &req) - 23.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_requirements_are_rejected() {
        let req = ModelRequirements::default().prefer("a").exclude("a");
        let err = selector()
            .select_from(&two_model_catalog(), None, None, &req)
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidRequirements(_)));
    }

    #[test]
    fn test_reason_mentions_long_context_and_vision() {
        let selector = selector();
        let catalog = Catalog::build(&EnvironmentConfig::new("e", ""), Arc::new(ModelTable::builtin()));
        let info = ModelInfo::new("gpt-4o", 128_000, true, 0.005, "");
        let req = ModelRequirements::default()
            .with_vision(VisionRequirement::Required)
            .with_priority(PriorityMode::Performance);
        assert_eq!(
            selector.reason(&catalog, "openai", "gpt-4o", &info, &req),
            "performance-first (score: 90), vision support, long context"
        );
    }

    #[test]
    fn test_performance_is_looked_up_by_catalog_key() {
        let selector = selector();
        let table = ModelTable::empty()
            .with_model("a", ModelInfo::new("a-1", 8192, false, 0.001, ""), 70.0)
            .with_availability("a", 90.0);
        let mut provider = ProviderInfo::new("a", "key-a", "");
        provider
            .models
            .insert("a-1".into(), ModelInfo::new("renamed", 8192, false, 0.001, ""));
        let mut env = EnvironmentConfig::new("test", "");
        env.providers.insert("a".into(), provider);
        let catalog = Catalog::build(&env, Arc::new(table));
        let req = ModelRequirements::default().with_priority(PriorityMode::Performance);

        let candidates = selector.candidates(&catalog, &req);
        assert_eq!(candidates.len(), 1);
        let report = selector.analyze_from(&catalog, "a", "a-1", &req);

        assert!((candidates[0].score - report.score).abs() < 1e-9);
        assert_eq!(candidates[0].reason, "performance-first (score: 70)");
        assert_eq!(report.reason, candidates[0].reason);
        assert_eq!(report.details.unwrap().performance_score, 70.0);
    }
}
