// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the dispatcher: handle caching, runtime switches and
//! request defaults. Adapters are in-test mocks; no network is involved.

use async_trait::async_trait;
use futures::StreamExt;
use modelgate_core::application::{Credentials, DispatchError, Dispatcher, ModelSelector};
use modelgate_core::domain::llm::{
    AdapterConfig, ExecutionRequest, ExecutionResponse, FinishReason, Message, ProviderAdapter, TokenUsage,
    TransportError,
};
use modelgate_core::domain::model_table::ModelTable;
use modelgate_core::domain::selection::ModelRequirements;
use modelgate_core::infrastructure::llm::AdapterRegistry;
use modelgate_core::infrastructure::{ConfigStore, ConfigStoreOptions, ManualClock, StaticEnv};
use parking_lot::Mutex;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Records every request and answers with a fixed token usage
struct RecordingAdapter {
    config: AdapterConfig,
    seen: Arc<Mutex<Vec<ExecutionRequest>>>,
}

#[async_trait]
impl ProviderAdapter for RecordingAdapter {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, TransportError> {
        self.seen.lock().push(request.clone());
        Ok(ExecutionResponse {
            session_id: request.session_id.clone(),
            message: Message::assistant(format!("{} via {}", self.config.model, self.config.base_url)),
            usage: TokenUsage {
                prompt_tokens: 500,
                completion_tokens: 500,
                total_tokens: 1000,
            },
            provider: self.config.provider.clone(),
            model: self.config.model.clone(),
            finish_reason: FinishReason::Stop,
            cost: 0.0,
            execution_time: Duration::ZERO,
            tool_calls: None,
        })
    }
}

struct FailingAdapter;

#[async_trait]
impl ProviderAdapter for FailingAdapter {
    async fn execute(&self, _request: &ExecutionRequest) -> Result<ExecutionResponse, TransportError> {
        Err(TransportError::RateLimit)
    }
}

struct Harness {
    dir: TempDir,
    store: Arc<ConfigStore>,
    registry: Arc<AdapterRegistry>,
    builds: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<ExecutionRequest>>>,
}

fn harness(env: StaticEnv) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ConfigStore::with_components(
        ConfigStoreOptions::new(dir.path()),
        Arc::new(ManualClock::new()),
        Arc::new(env),
        Arc::new(ModelTable::builtin()),
    ));

    let builds = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recording = {
        let builds = builds.clone();
        let seen = seen.clone();
        move |config: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(RecordingAdapter {
                config: config.clone(),
                seen: seen.clone(),
            }))
        }
    };

    let registry = AdapterRegistry::new()
        .with_default(recording)
        .register("ernie", |config: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            anyhow::bail!("ernie adapter requires a secret key for {}", config.model)
        })
        .register("chatglm", |_: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            Ok(Arc::new(FailingAdapter))
        });

    Harness {
        dir,
        store,
        registry: Arc::new(registry),
        builds,
        seen,
    }
}

fn default_env() -> StaticEnv {
    StaticEnv::new()
        .with("LLM_PROVIDERS_OPENAI_API_KEY", "sk-openai")
        .with("LLM_PROVIDERS_DEEPSEEK_API_KEY", "sk-ds")
        .with("LLM_PROVIDERS_CHATGLM_API_KEY", "sk-glm")
        .with("LLM_MODEL", "gpt-4o")
}

fn request() -> ExecutionRequest {
    ExecutionRequest::new("session-1", vec![Message::user("hello")])
}

#[tokio::test]
async fn test_execute_fills_defaults_and_cost() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::from_environment_defaults(h.store.clone(), h.registry.clone());
    assert_eq!(dispatcher.bound_provider(), "openai");
    assert_eq!(dispatcher.bound_model(), "gpt-4o");

    let response = dispatcher.execute(request()).await.unwrap();
    assert_eq!(response.provider, "openai");
    assert_eq!(response.model, "gpt-4o");
    // 1000 tokens at 0.005 per 1k
    assert!((response.cost - 0.005).abs() < 1e-12);

    let seen = h.seen.lock();
    assert_eq!(seen[0].model.as_deref(), Some("gpt-4o"));
    assert_eq!(seen[0].temperature, Some(0.7));
    assert_eq!(seen[0].max_tokens, Some(2000));
}

#[tokio::test]
async fn test_caller_values_are_not_overridden() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", None);
    assert_eq!(dispatcher.bound_model(), "gpt-4");

    let mut req = request();
    req.temperature = Some(0.1);
    req.max_tokens = Some(64);
    dispatcher.execute(req).await.unwrap();

    let seen = h.seen.lock();
    assert_eq!(seen[0].temperature, Some(0.1));
    assert_eq!(seen[0].max_tokens, Some(64));
}

#[tokio::test]
async fn test_handle_is_cached_between_requests() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "deepseek", None);

    dispatcher.execute(request()).await.unwrap();
    dispatcher.execute(request()).await.unwrap();
    assert_eq!(h.builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handle_rebuilt_when_credentials_change_on_reload() {
    let h = harness(default_env());
    let envs = h.dir.path().join("environments");
    fs::create_dir_all(&envs).unwrap();
    let write_default = |url: &str| {
        fs::write(
            envs.join("default.json"),
            format!(
                r#"{{"providers": {{"openai": {{"api_key": "sk-file", "base_url": "{}"}}}}}}"#,
                url
            ),
        )
        .unwrap();
    };

    write_default("http://first.local");
    h.store.reload();
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", Some("gpt-4o"));
    let first = dispatcher.execute(request()).await.unwrap();
    assert_eq!(first.message.content, "gpt-4o via http://first.local");

    write_default("http://second.local");
    h.store.reload();
    let second = dispatcher.execute(request()).await.unwrap();
    assert_eq!(second.message.content, "gpt-4o via http://second.local");
    assert_eq!(h.builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_switch_engine_rebinds() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", None);

    dispatcher
        .switch_engine("deepseek", None, Some("deepseek-reasoner"))
        .unwrap();
    assert_eq!(dispatcher.bound_provider(), "deepseek");
    assert_eq!(dispatcher.bound_model(), "deepseek-reasoner");

    let response = dispatcher.execute(request()).await.unwrap();
    assert_eq!(response.provider, "deepseek");
}

#[tokio::test]
async fn test_switch_with_runtime_credentials() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", None);

    // anthropic has no configured key; the override supplies one
    dispatcher
        .switch_engine(
            "anthropic",
            Some(Credentials::api_key("sk-runtime").with_base_url("http://proxy.local")),
            None,
        )
        .unwrap();
    assert_eq!(dispatcher.bound_model(), "claude-3-sonnet-20240229");

    let response = dispatcher.execute(request()).await.unwrap();
    assert_eq!(response.message.content, "claude-3-sonnet-20240229 via http://proxy.local");
}

#[tokio::test]
async fn test_failed_switch_keeps_previous_binding() {
    let h = harness(default_env().with("LLM_PROVIDERS_ERNIE_API_KEY", "e").with("LLM_PROVIDERS_ERNIE_SECRET_KEY", "s"));
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", Some("gpt-4o"));

    let err = dispatcher.switch_engine("ernie", None, None).unwrap_err();
    match err {
        DispatchError::SwitchRejected { provider, source } => {
            assert_eq!(provider, "ernie");
            assert!(source.to_string().contains("secret key"));
        }
        other => panic!("expected SwitchRejected, got {:?}", other),
    }
    assert_eq!(dispatcher.bound_provider(), "openai");
    assert_eq!(dispatcher.bound_model(), "gpt-4o");
    assert!(dispatcher.execute(request()).await.is_ok());
}

#[tokio::test]
async fn test_switch_rejects_unknown_model_and_missing_credentials() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", None);

    assert!(matches!(
        dispatcher.switch_engine("openai", None, Some("gpt-99")),
        Err(DispatchError::SwitchRejected { .. })
    ));
    assert!(matches!(
        dispatcher.switch_engine("anthropic", None, None),
        Err(DispatchError::SwitchRejected { .. })
    ));
    assert!(matches!(
        dispatcher.switch_engine("mystery", None, None),
        Err(DispatchError::SwitchRejected { .. })
    ));
    assert_eq!(dispatcher.bound_model(), "gpt-4");
}

#[tokio::test]
async fn test_unconfigured_provider_fails_on_execute() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "qwen", None);

    assert!(matches!(
        dispatcher.execute(request()).await,
        Err(DispatchError::ProviderNotConfigured(p)) if p == "qwen"
    ));
}

#[tokio::test]
async fn test_adapter_errors_propagate() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "chatglm", None);

    assert!(matches!(
        dispatcher.execute(request()).await,
        Err(DispatchError::Adapter(TransportError::RateLimit))
    ));
}

#[tokio::test]
async fn test_execute_stream_single_chunk() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::new(h.store.clone(), h.registry.clone(), "openai", Some("gpt-4o-mini"));

    let chunks: Vec<_> = dispatcher.execute_stream(request()).unwrap().collect().await;
    assert_eq!(chunks.len(), 1);
    let chunk = chunks.into_iter().next().unwrap().unwrap();
    assert!(chunk.content.starts_with("gpt-4o-mini"));
    assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn test_dispatch_from_selection() {
    let h = harness(default_env());
    let selector = ModelSelector::new(h.store.clone());
    let outcome = selector
        .select_best_model(Some("deepseek"), Some("deepseek-chat"), &ModelRequirements::default())
        .unwrap();

    let dispatcher = Dispatcher::from_selection(h.store.clone(), h.registry.clone(), &outcome);
    let response = dispatcher.execute(request()).await.unwrap();
    assert_eq!((response.provider.as_str(), response.model.as_str()), ("deepseek", "deepseek-chat"));
}

#[test]
fn test_available_providers_introspection() {
    let h = harness(default_env());
    let dispatcher = Dispatcher::from_environment_defaults(h.store.clone(), h.registry.clone());

    let providers = dispatcher.available_providers();
    assert_eq!(providers.get("openai"), Some(&true));
    assert_eq!(providers.get("deepseek"), Some(&true));
    // registered but not configured
    assert_eq!(providers.get("ernie"), Some(&false));
    assert_eq!(providers.get("qwen"), None);
}
