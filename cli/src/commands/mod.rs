// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the modelgate CLI

pub mod env;
pub mod execute;
pub mod models;
pub mod select;

pub use self::env::EnvCommand;
pub use self::execute::ExecuteArgs;
pub use self::models::ModelsCommand;

use clap::Args;

use modelgate_core::domain::selection::{ModelRequirements, PriorityMode, VisionRequirement};

/// Requirement flags shared by the selection commands
#[derive(Args, Debug, Clone)]
pub struct RequirementArgs {
    /// Optimization target (cost, performance, balanced)
    #[arg(long, default_value = "balanced")]
    pub priority: PriorityMode,

    /// Maximum price per 1k tokens (USD)
    #[arg(long, value_name = "USD")]
    pub max_cost: Option<f64>,

    /// Minimum context window in tokens
    #[arg(long, value_name = "TOKENS")]
    pub min_tokens: Option<u32>,

    /// Vision support (required, forbidden, dont-care)
    #[arg(long, default_value = "dont-care")]
    pub vision: VisionRequirement,

    /// Restrict candidates to these providers
    #[arg(long = "prefer", value_name = "PROVIDER", value_delimiter = ',')]
    pub preferred: Vec<String>,

    /// Never choose these providers
    #[arg(long = "exclude", value_name = "PROVIDER", value_delimiter = ',')]
    pub excluded: Vec<String>,
}

impl RequirementArgs {
    pub fn to_requirements(&self) -> ModelRequirements {
        let mut requirements = ModelRequirements::default()
            .with_priority(self.priority)
            .with_vision(self.vision);
        if let Some(cost) = self.max_cost {
            requirements = requirements.with_max_cost(cost);
        }
        if let Some(tokens) = self.min_tokens {
            requirements = requirements.with_min_tokens(tokens);
        }
        for provider in &self.preferred {
            requirements = requirements.prefer(provider);
        }
        for provider in &self.excluded {
            requirements = requirements.exclude(provider);
        }
        requirements
    }
}
