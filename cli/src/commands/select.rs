// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Model selection commands
//!
//! Commands: select, recommend, analyze

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use modelgate_core::application::ModelSelector;
use modelgate_core::infrastructure::ConfigStore;

use super::RequirementArgs;

pub fn select(
    store: Arc<ConfigStore>,
    provider: Option<&str>,
    model: Option<&str>,
    requirements: &RequirementArgs,
    json: bool,
) -> Result<()> {
    let selector = ModelSelector::new(store);
    let outcome = selector
        .select_best_model(provider, model, &requirements.to_requirements())
        .context("Model selection failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} {}/{}",
        "Selected:".bold(),
        outcome.provider.green(),
        outcome.model.green()
    );
    println!("  Kind: {}", outcome.kind);
    println!("  Reason: {}", outcome.reason);
    if let Some(score) = outcome.score {
        println!("  Score: {:.2}", score);
    }
    println!("  Candidates considered: {}", outcome.candidates);

    Ok(())
}

pub fn recommend(store: Arc<ConfigStore>, requirements: &RequirementArgs, json: bool) -> Result<()> {
    let selector = ModelSelector::new(store);
    let ranked = selector
        .recommendations(&requirements.to_requirements())
        .context("Failed to compute recommendations")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("{}", "No model satisfies the requirements".yellow());
        return Ok(());
    }

    println!("{}", "Recommendations:".bold());
    for (rank, candidate) in ranked.iter().enumerate() {
        println!(
            "  {}. {}/{}  {:.2}  {}",
            rank + 1,
            candidate.provider.bold(),
            candidate.model,
            candidate.score,
            candidate.reason.dimmed()
        );
    }

    Ok(())
}

pub fn analyze(
    store: Arc<ConfigStore>,
    provider: &str,
    model: &str,
    requirements: &RequirementArgs,
    json: bool,
) -> Result<()> {
    let selector = ModelSelector::new(store);
    let report = selector.analyze_suitability(provider, model, &requirements.to_requirements());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let verdict = if report.suitable {
        "suitable".green()
    } else {
        "not suitable".red()
    };
    println!("{}/{}: {}", report.provider.bold(), report.model.bold(), verdict);

    if let Some(error) = &report.validation_error {
        println!("  {}", error);
        return Ok(());
    }

    println!("  Score: {:.2}", report.score);
    println!("  Reason: {}", report.reason);
    if let Some(details) = &report.details {
        println!("  Cost: ${:.4}/1k tokens", details.cost_per_1k_tokens);
        println!("  Context: {} tokens", details.max_tokens);
        println!("  Vision: {}", if details.supports_vision { "yes" } else { "no" });
        println!("  Performance: {}", details.performance_score);
        if !details.description.is_empty() {
            println!("  {}", details.description.dimmed());
        }
    }

    Ok(())
}
