// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for model selection against a loaded configuration.

use modelgate_core::application::{ModelSelector, SelectionError, SelectionPolicy};
use modelgate_core::domain::model_table::ModelTable;
use modelgate_core::domain::selection::{ModelRequirements, PriorityMode, SelectionKind, VisionRequirement};
use modelgate_core::infrastructure::{ConfigStore, ConfigStoreOptions, ManualClock, StaticEnv};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn store_with(env: StaticEnv, files: &[(&str, &str)]) -> (Arc<ConfigStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    if !files.is_empty() {
        let envs = dir.path().join("environments");
        fs::create_dir_all(&envs).unwrap();
        for (name, content) in files {
            fs::write(envs.join(name), content).unwrap();
        }
    }
    let store = ConfigStore::with_components(
        ConfigStoreOptions::new(dir.path()),
        Arc::new(ManualClock::new()),
        Arc::new(env),
        Arc::new(ModelTable::builtin()),
    );
    (Arc::new(store), dir)
}

fn multi_provider() -> (Arc<ConfigStore>, TempDir) {
    store_with(
        StaticEnv::new()
            .with("LLM_PROVIDERS_OPENAI_API_KEY", "sk-openai")
            .with("LLM_PROVIDERS_ANTHROPIC_API_KEY", "sk-ant")
            .with("LLM_PROVIDERS_DEEPSEEK_API_KEY", "sk-ds"),
        &[],
    )
}

#[test]
fn test_explicit_hint_is_honored() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);

    let outcome = selector
        .select_best_model(Some("anthropic"), Some("claude-3-opus-20240229"), &ModelRequirements::default())
        .unwrap();

    assert_eq!(outcome.kind, SelectionKind::Explicit);
    assert_eq!(outcome.provider, "anthropic");
    assert_eq!(outcome.model, "claude-3-opus-20240229");
    assert_eq!(outcome.reason, "explicit: anthropic/claude-3-opus-20240229");
}

#[test]
fn test_explicit_hint_failing_requirements_falls_through_to_scoring() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);
    let req = ModelRequirements::default().with_max_cost(0.001);

    let outcome = selector
        .select_best_model(Some("openai"), Some("gpt-4"), &req)
        .unwrap();

    assert_eq!(outcome.kind, SelectionKind::Scored);
    assert_ne!(outcome.model, "gpt-4");
}

#[test]
fn test_invalid_hint_never_fails_selection() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);

    for (provider, model) in [("mistral", "large"), ("openai", "gpt-99"), ("qwen", "qwen-max")] {
        let outcome = selector
            .select_best_model(Some(provider), Some(model), &ModelRequirements::default())
            .unwrap();
        assert_eq!(outcome.kind, SelectionKind::Scored);
    }
}

#[test]
fn test_every_candidate_respects_constraints() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store.clone());
    let req = ModelRequirements::default()
        .with_max_cost(0.005)
        .with_min_tokens(32_000);

    let candidates = selector.candidates(&store.catalog(), &req);
    assert!(!candidates.is_empty());
    for c in &candidates {
        assert!(c.info.cost_per_1k_tokens <= 0.005, "{}/{}", c.provider, c.model);
        assert!(c.info.max_tokens >= 32_000, "{}/{}", c.provider, c.model);
        assert!(c.score.is_finite());
        assert!(!c.reason.is_empty());
    }
}

#[test]
fn test_selection_is_deterministic() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);
    let req = ModelRequirements::default().with_priority(PriorityMode::Performance);

    let first = selector.select_best_model(None, None, &req).unwrap();
    for _ in 0..10 {
        let again = selector.select_best_model(None, None, &req).unwrap();
        assert_eq!((again.provider.as_str(), again.model.as_str()), (first.provider.as_str(), first.model.as_str()));
        assert_eq!(again.score, first.score);
    }
}

#[test]
fn test_vision_and_exclusion_filters() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);

    let req = ModelRequirements::default()
        .with_vision(VisionRequirement::Required)
        .exclude("openai");
    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.provider, "anthropic");
    assert!(outcome.reason.contains("vision support"));

    let req = ModelRequirements::default().with_vision(VisionRequirement::Forbidden);
    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.provider, "deepseek");
}

#[test]
fn test_fallback_when_nothing_meets_requirements() {
    let (store, _dir) = store_with(StaticEnv::new().with("LLM_PROVIDERS_OPENAI_API_KEY", "sk"), &[]);
    let selector = ModelSelector::new(store);
    let req = ModelRequirements::default().with_max_cost(0.00001);

    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.kind, SelectionKind::Fallback);
    assert_eq!((outcome.provider.as_str(), outcome.model.as_str()), ("openai", "gpt-3.5-turbo"));
    assert_eq!(outcome.reason, "fallback: openai/gpt-3.5-turbo");
}

#[test]
fn test_fallback_chain_skips_unavailable_pairs() {
    let (store, _dir) = store_with(StaticEnv::new().with("LLM_PROVIDERS_QWEN_API_KEY", "sk-qwen"), &[]);
    let selector = ModelSelector::new(store);
    let req = ModelRequirements::default().with_min_tokens(1_000_000);

    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.kind, SelectionKind::Fallback);
    assert_eq!((outcome.provider.as_str(), outcome.model.as_str()), ("qwen", "qwen-turbo"));
}

#[test]
fn test_last_resort_uses_first_available_model() {
    let local = r#"{
        "default_provider": "local",
        "providers": {
            "local": {
                "api_key": "token",
                "base_url": "http://localhost:8080",
                "models": {
                    "tiny": {"max_tokens": 2048, "cost_per_1k_tokens": 0.0},
                    "small": {"max_tokens": 4096, "cost_per_1k_tokens": 0.0}
                }
            }
        }
    }"#;
    let (store, _dir) = store_with(StaticEnv::new(), &[("default.json", local)]);
    let selector = ModelSelector::new(store);
    let req = ModelRequirements::default().with_min_tokens(1_000_000);

    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.kind, SelectionKind::LastResort);
    assert_eq!((outcome.provider.as_str(), outcome.model.as_str()), ("local", "tiny"));
}

#[test]
fn test_no_available_provider_is_an_error() {
    let (store, _dir) = store_with(StaticEnv::new(), &[]);
    let selector = ModelSelector::new(store);

    assert_eq!(
        selector
            .select_best_model(None, None, &ModelRequirements::default())
            .unwrap_err(),
        SelectionError::NoCandidateAvailable
    );
}

#[test]
fn test_overridden_fallback_chain() {
    let (store, _dir) = store_with(StaticEnv::new().with("LLM_PROVIDERS_OPENAI_API_KEY", "sk"), &[]);
    let policy = SelectionPolicy::default().with_fallback_chain(vec![("openai".into(), "gpt-4o".into())]);
    let selector = ModelSelector::new(store).with_policy(policy);
    let req = ModelRequirements::default().with_max_cost(0.00001);

    let outcome = selector.select_best_model(None, None, &req).unwrap();
    assert_eq!(outcome.model, "gpt-4o");
}

#[test]
fn test_recommendations_are_ranked_and_limited() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);

    let recs = selector.recommendations(&ModelRequirements::default()).unwrap();
    assert_eq!(recs.len(), 5);
    for pair in recs.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let best = selector
        .select_best_model(None, None, &ModelRequirements::default())
        .unwrap();
    assert_eq!((recs[0].provider.as_str(), recs[0].model.as_str()), (best.provider.as_str(), best.model.as_str()));
}

#[test]
fn test_analyze_suitability() {
    let (store, _dir) = multi_provider();
    let selector = ModelSelector::new(store);

    let report = selector.analyze_suitability("qwen", "qwen-max", &ModelRequirements::default());
    assert!(!report.suitable);
    assert!(report.validation_error.unwrap().contains("not configured"));
    assert!(report.details.is_none());

    let req = ModelRequirements::default().with_max_cost(0.01);
    let report = selector.analyze_suitability("openai", "gpt-4", &req);
    assert!(!report.suitable);
    assert!(report.validation_error.is_none());
    let details = report.details.unwrap();
    assert_eq!(details.max_tokens, 8192);
    assert_eq!(details.performance_score, 95.0);

    let report = selector.analyze_suitability("openai", "gpt-4o", &req);
    assert!(report.suitable);
    assert!(report.score > 0.0);
    assert!(report.reason.starts_with("balanced"));
}
