// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Environment management commands
//!
//! Commands: list, show, validate, export

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use modelgate_core::infrastructure::ConfigStore;

#[derive(Subcommand)]
pub enum EnvCommand {
    /// List loaded environments
    List,

    /// Show an environment's summary (default: active environment)
    Show {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Validate an environment (default: every environment)
    Validate {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Export an environment with credentials masked
    Export {
        #[arg(value_name = "NAME")]
        name: String,

        /// Write the export to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

pub fn handle_command(command: EnvCommand, store: &ConfigStore) -> Result<()> {
    match command {
        EnvCommand::List => list(store),
        EnvCommand::Show { name } => show(store, name.as_deref()),
        EnvCommand::Validate { name } => validate(store, name.as_deref()),
        EnvCommand::Export { name, output } => export(store, &name, output),
    }
}

fn list(store: &ConfigStore) -> Result<()> {
    let active = store.active_environment();

    println!("{}", "Environments:".bold());
    for name in store.environment_names() {
        let Some(stats) = store.environment_stats(Some(&name)) else {
            continue;
        };
        let marker = if name == active { "*".green() } else { " ".normal() };
        println!(
            "{} {} ({}/{} providers available) {}",
            marker,
            name.bold(),
            stats.available_providers,
            stats.total_providers,
            stats.description.dimmed()
        );
    }

    Ok(())
}

fn show(store: &ConfigStore, name: Option<&str>) -> Result<()> {
    let env = store
        .environment_config(name)
        .with_context(|| format!("Environment '{}' not found", name.unwrap_or("(active)")))?;
    let stats = env.stats();

    println!("{} {}", "Environment:".bold(), env.name);
    if !env.description.is_empty() {
        println!("  Description: {}", env.description);
    }
    println!("  Default: {}/{}", env.default_provider, env.default_model);
    println!(
        "  Providers: {} total, {} available",
        stats.total_providers, stats.available_providers
    );
    if !env.usable {
        println!(
            "  {}",
            "No configuration source produced this environment; it cannot serve requests".yellow()
        );
    }
    println!();

    println!("{}", "Providers:".bold());
    for (provider_name, provider) in &env.providers {
        let status = if provider.is_usable() {
            "available".green()
        } else if provider.has_credential() {
            "disabled".yellow()
        } else {
            "no credential".red()
        };
        println!("  {} [{}]", provider_name.bold(), status);
        println!("    Endpoint: {}", provider.base_url);
        if let Some(limit) = env.rate_limits.get(provider_name) {
            println!("    Rate limit: {} req/min", limit);
        }
        if let Some(limit) = env.cost_limits.get(provider_name) {
            println!("    Cost limit: ${:.2}", limit);
        }
    }

    Ok(())
}

fn validate(store: &ConfigStore, name: Option<&str>) -> Result<()> {
    let names = match name {
        Some(name) => vec![name.to_string()],
        None => store.environment_names(),
    };

    let mut failures = 0;
    for name in &names {
        match store.validate_environment(name) {
            Ok(()) => println!("{} {}", "✓".green(), name),
            Err(e) => {
                failures += 1;
                println!("{} {}: {}", "✗".red(), name, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} environments failed validation", failures, names.len());
    }

    println!("{}", "All environments valid".green());
    Ok(())
}

fn export(store: &ConfigStore, name: &str, output: Option<PathBuf>) -> Result<()> {
    let json = store
        .export_environment(name, output.as_deref())
        .with_context(|| format!("Failed to export environment '{}'", name))?;

    match output {
        Some(path) => println!(
            "{} Exported '{}' to {}",
            "✓".green(),
            name,
            path.display()
        ),
        None => println!("{}", json),
    }

    Ok(())
}
