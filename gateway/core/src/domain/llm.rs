// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Backend adapter contract and the execution request/response shapes that
//! flow through the dispatcher.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary between routing and provider wire protocols

// Provider Adapter Domain Interface
//
// Every concrete backend (OpenAI, DeepSeek, Anthropic, ...) lives outside this
// crate and is plugged in through the AdapterRegistry. The routing core only
// sees this trait.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Stream of incremental chunks produced by `execute_stream`
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, TransportError>>;

/// Domain interface for provider backends
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    /// Execute a request and wait for the full response
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, TransportError>;

    /// Execute a request and stream the response.
    ///
    /// Adapters without native streaming get a single-chunk stream built from
    /// `execute`.
    fn execute_stream(self: Arc<Self>, request: ExecutionRequest) -> ChunkStream {
        Box::pin(futures::stream::once(async move {
            let response = self.execute(&request).await?;
            Ok(StreamChunk {
                content: response.message.content,
                finish_reason: Some(response.finish_reason),
                usage: Some(response.usage),
            })
        }))
    }
}

/// Everything an adapter needs to talk to one provider with one model
#[derive(Clone)]
pub struct AdapterConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub extra_config: indexmap::IndexMap<String, serde_json::Value>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,

    /// Optional image reference for multimodal requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// A single execution request as handed to an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub session_id: String,
    pub messages: Vec<Message>,

    /// Filled in by the dispatcher with the bound model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature; the global default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate; the global default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
}

impl ExecutionRequest {
    pub fn new(session_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            session_id: session_id.into(),
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            tools: None,
        }
    }

    /// Whether any message carries an image
    pub fn has_images(&self) -> bool {
        self.messages.iter().any(|m| m.image_url.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResponse {
    pub session_id: String,
    pub message: Message,
    pub usage: TokenUsage,

    /// Provider that served the request (e.g., "openai", "deepseek")
    pub provider: String,

    /// Model that served the request (e.g., "gpt-4o", "deepseek-chat")
    pub model: String,

    pub finish_reason: FinishReason,

    /// Estimated cost in USD; filled from catalog pricing when the adapter leaves it at zero
    pub cost: f64,

    /// Wall-clock time spent inside the adapter
    pub execution_time: Duration,

    pub tool_calls: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion (model decided to stop)
    Stop,

    /// Hit max_tokens limit
    Length,

    /// Model asked for a tool call
    ToolCalls,

    /// Blocked by content filter
    ContentFilter,
}

#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
}

/// Errors raised by adapters while talking to a provider
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
