// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Model catalog and provider status commands

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::sync::Arc;

use modelgate_core::application::Dispatcher;
use modelgate_core::infrastructure::llm::AdapterRegistry;
use modelgate_core::infrastructure::ConfigStore;

#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List models offered by the active environment's available providers
    List {
        /// Only show models of this provider
        #[arg(long)]
        provider: Option<String>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_command(command: ModelsCommand, store: &ConfigStore) -> Result<()> {
    match command {
        ModelsCommand::List { provider, json } => list(store, provider.as_deref(), json),
    }
}

fn list(store: &ConfigStore, provider: Option<&str>, json: bool) -> Result<()> {
    let catalog = store.catalog();

    if json {
        let mut info = catalog.models_info();
        if let Some(provider) = provider {
            info.retain(|name, _| name == provider);
        }
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let available = catalog.available_models(provider);
    if available.is_empty() {
        println!(
            "{}",
            format!("No available models in environment '{}'", catalog.environment()).yellow()
        );
        return Ok(());
    }

    println!(
        "{} {}",
        "Models in environment".bold(),
        catalog.environment().bold()
    );
    for (provider_name, models) in &available {
        let default = catalog.default_model(provider_name);
        println!("  {}", provider_name.bold());
        for model in models {
            let Some(info) = catalog.model_info(provider_name, model) else {
                continue;
            };
            let marker = if default.as_deref() == Some(model.as_str()) {
                " (default)".dimmed().to_string()
            } else {
                String::new()
            };
            println!(
                "    - {}{}  ${:.4}/1k  {} tokens{}  perf {}",
                model,
                marker,
                info.cost_per_1k_tokens,
                info.max_tokens,
                if info.supports_vision { "  vision" } else { "" },
                catalog.performance_score(provider_name, model)
            );
        }
    }

    Ok(())
}

/// Credential status per provider, as seen by a dispatcher
pub fn providers(store: Arc<ConfigStore>) -> Result<()> {
    let registry = Arc::new(AdapterRegistry::new());
    let dispatcher = Dispatcher::from_environment_defaults(store.clone(), registry);

    println!(
        "{} {}",
        "Providers in environment".bold(),
        store.active_environment().bold()
    );
    for (name, configured) in dispatcher.available_providers() {
        let status = if configured {
            "configured".green()
        } else {
            "no credential".red()
        };
        let score = store.catalog().availability_score(&name);
        println!("  {} [{}] availability {}", name.bold(), status, score);
    }

    Ok(())
}
