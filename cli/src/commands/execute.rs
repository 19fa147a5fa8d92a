// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Dry-run execution
//!
//! Routes a prompt through selection and the dispatcher exactly as a service
//! would, but every provider is served by the echoing dry-run adapter.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use modelgate_core::application::{Credentials, Dispatcher, ModelSelector};
use modelgate_core::domain::llm::{AdapterConfig, ExecutionRequest, Message, ProviderAdapter};
use modelgate_core::domain::selection::{ModelRequirements, VisionRequirement};
use modelgate_core::infrastructure::llm::{AdapterRegistry, DryRunAdapter};
use modelgate_core::infrastructure::ConfigStore;

use super::RequirementArgs;

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Prompt to send
    pub prompt: String,

    /// Bind this provider instead of selecting one
    #[arg(long)]
    pub provider: Option<String>,

    /// Bind this model (requires --provider)
    #[arg(long, requires = "provider")]
    pub model: Option<String>,

    /// Runtime API key for the bound provider
    #[arg(long, env = "MODELGATE_API_KEY", hide_env_values = true, requires = "provider")]
    pub api_key: Option<String>,

    /// Runtime base URL for the bound provider
    #[arg(long, requires = "provider")]
    pub base_url: Option<String>,

    /// Image URL attached to the prompt
    #[arg(long)]
    pub image: Option<String>,

    /// Sampling temperature (default: global setting)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (default: global setting)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Consume the response as a stream
    #[arg(long)]
    pub stream: bool,

    #[command(flatten)]
    pub requirements: RequirementArgs,
}

fn dry_run_registry() -> AdapterRegistry {
    AdapterRegistry::new().with_default(
        |config: &AdapterConfig| -> anyhow::Result<Arc<dyn ProviderAdapter>> {
            Ok(Arc::new(DryRunAdapter::new(config)))
        },
    )
}

pub async fn execute(store: Arc<ConfigStore>, args: ExecuteArgs) -> Result<()> {
    let registry = Arc::new(dry_run_registry());

    let mut message = Message::user(args.prompt.clone());
    if let Some(image) = &args.image {
        message = message.with_image(image.clone());
    }
    let mut request = ExecutionRequest::new(Uuid::new_v4().to_string(), vec![message]);
    request.temperature = args.temperature;
    request.max_tokens = args.max_tokens;

    let dispatcher = match &args.provider {
        Some(provider) => {
            let dispatcher = Dispatcher::from_environment_defaults(store.clone(), registry);
            let credentials = (args.api_key.is_some() || args.base_url.is_some()).then(|| Credentials {
                api_key: args.api_key.clone(),
                base_url: args.base_url.clone(),
            });
            dispatcher
                .switch_engine(provider, credentials, args.model.as_deref())
                .with_context(|| format!("Failed to bind provider '{}'", provider))?;
            dispatcher
        }
        None => {
            let mut requirements = args.requirements.to_requirements();
            if requirements.vision == VisionRequirement::DontCare {
                requirements.vision = ModelRequirements::for_request(&request).vision;
            }
            let outcome = ModelSelector::new(store.clone())
                .select_best_model(None, None, &requirements)
                .context("Model selection failed")?;
            debug!("Selected {}/{} ({})", outcome.provider, outcome.model, outcome.reason);
            Dispatcher::from_selection(store.clone(), registry, &outcome)
        }
    };

    println!(
        "{} {}/{} (session {})",
        "Dispatching to".bold(),
        dispatcher.bound_provider().green(),
        dispatcher.bound_model().green(),
        request.session_id.dimmed()
    );

    if args.stream {
        let mut chunks = dispatcher.execute_stream(request)?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.context("Stream failed")?;
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
            if let Some(usage) = chunk.usage {
                writeln!(stdout)?;
                println!("{}", format!("{} tokens", usage.total_tokens).dimmed());
            }
        }
        return Ok(());
    }

    let response = dispatcher.execute(request).await.context("Execution failed")?;
    println!("{}", response.message.content);
    println!(
        "{}",
        format!(
            "{} tokens, ${:.6}, {:?}, finish: {:?}",
            response.usage.total_tokens, response.cost, response.execution_time, response.finish_reason
        )
        .dimmed()
    );

    Ok(())
}
