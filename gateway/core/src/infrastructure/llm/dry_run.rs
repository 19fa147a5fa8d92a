// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Dry-Run Adapter
//
// Echoes the last user message back without any network traffic. Used by the
// operator CLI to exercise routing end to end.

use async_trait::async_trait;

use crate::domain::llm::{
    AdapterConfig, ExecutionRequest, ExecutionResponse, FinishReason, Message, MessageRole, ProviderAdapter,
    TokenUsage, TransportError,
};

pub struct DryRunAdapter {
    provider: String,
    model: String,
}

impl DryRunAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
        }
    }
}

/// Rough whitespace token count
fn approximate_tokens(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

#[async_trait]
impl ProviderAdapter for DryRunAdapter {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, TransportError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| TransportError::InvalidInput("request has no user message".to_string()))?;

        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let content = format!("[dry-run {}/{}] {}", self.provider, model, prompt.content);

        let prompt_tokens = request.messages.iter().map(|m| approximate_tokens(&m.content)).sum::<u32>();
        let completion_tokens = approximate_tokens(&content);

        Ok(ExecutionResponse {
            session_id: request.session_id.clone(),
            message: Message::assistant(content),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            provider: self.provider.clone(),
            model,
            finish_reason: FinishReason::Stop,
            cost: 0.0,
            execution_time: Default::default(),
            tool_calls: None,
        })
    }
}
