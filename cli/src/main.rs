// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Modelgate CLI
//!
//! The `modelgate` binary inspects an environment-scoped LLM provider
//! configuration and exercises model selection against it.
//!
//! ## Configuration sources
//!
//! - `LLM_PROVIDERS_<NAME>_*` process variables (and a `.env` file) form the base `default` environment
//! - `<config-dir>/environments/*.{json,yaml,yml}` define named environments
//! - `<config-dir>/global_settings.{json,yaml,yml}` holds process-wide defaults
//!
//! ## Commands
//!
//! - `modelgate env list|show|validate|export` - Environment management
//! - `modelgate models list` - Model catalog of the active environment
//! - `modelgate select|recommend|analyze` - Model selection
//! - `modelgate providers` - Provider credential status
//! - `modelgate execute` - Dry-run a prompt through the dispatcher

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use modelgate_core::infrastructure::{ConfigStore, ConfigStoreOptions};

mod commands;

use commands::{EnvCommand, ExecuteArgs, ModelsCommand, RequirementArgs};

/// Modelgate - environment-aware LLM provider and model selection
#[derive(Parser)]
#[command(name = "modelgate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration directory holding environments/ and global settings
    #[arg(
        short,
        long,
        global = true,
        env = "MODELGATE_CONFIG_DIR",
        default_value = "./config",
        value_name = "DIR"
    )]
    config_dir: PathBuf,

    /// Environment to activate before running the command
    #[arg(short, long, global = true, env = "MODELGATE_ENVIRONMENT")]
    environment: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MODELGATE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Environment management
    #[command(name = "env")]
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },

    /// Model catalog
    #[command(name = "models")]
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },

    /// Select the best model for the given requirements
    #[command(name = "select")]
    Select {
        /// Preferred provider (used only together with --model)
        #[arg(long)]
        provider: Option<String>,

        /// Preferred model (used only together with --provider)
        #[arg(long)]
        model: Option<String>,

        #[command(flatten)]
        requirements: RequirementArgs,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank the candidates that satisfy the given requirements
    #[command(name = "recommend")]
    Recommend {
        #[command(flatten)]
        requirements: RequirementArgs,

        /// Print the ranking as JSON
        #[arg(long)]
        json: bool,
    },

    /// Explain how well one provider/model pair fits the requirements
    #[command(name = "analyze")]
    Analyze {
        provider: String,
        model: String,

        #[command(flatten)]
        requirements: RequirementArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which providers have credentials configured
    #[command(name = "providers")]
    Providers,

    /// Send a prompt through the dispatcher using the dry-run adapter
    #[command(name = "execute")]
    Execute {
        #[command(flatten)]
        args: ExecuteArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    let store = open_store(cli.config_dir, cli.environment.as_deref())?;

    match command {
        Commands::Env { command } => commands::env::handle_command(command, &store),
        Commands::Models { command } => commands::models::handle_command(command, &store),
        Commands::Select {
            provider,
            model,
            requirements,
            json,
        } => commands::select::select(
            store,
            provider.as_deref(),
            model.as_deref(),
            &requirements,
            json,
        ),
        Commands::Recommend { requirements, json } => {
            commands::select::recommend(store, &requirements, json)
        }
        Commands::Analyze {
            provider,
            model,
            requirements,
            json,
        } => commands::select::analyze(store, &provider, &model, &requirements, json),
        Commands::Providers => commands::models::providers(store),
        Commands::Execute { args } => commands::execute::execute(store, args).await,
    }
}

/// Load the configuration directory and activate the requested environment
fn open_store(config_dir: PathBuf, environment: Option<&str>) -> Result<Arc<ConfigStore>> {
    debug!("Loading configuration from {}", config_dir.display());
    let store = ConfigStore::new(ConfigStoreOptions::new(&config_dir));

    if let Some(name) = environment {
        if !store.switch_environment(name) {
            bail!(
                "Environment '{}' not found (known: {})",
                name,
                store.environment_names().join(", ")
            );
        }
    }

    info!(
        "Active environment: {} ({} environments loaded)",
        store.active_environment(),
        store.environment_names().len()
    );
    Ok(Arc::new(store))
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
