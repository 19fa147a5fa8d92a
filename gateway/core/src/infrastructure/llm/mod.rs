// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Adapter Infrastructure
//
// Concrete wire adapters live with the embedding service. This crate ships the
// registry that maps provider names to adapter factories, plus a dry-run
// adapter used by the operator CLI.

pub mod registry;
pub mod dry_run;

pub use registry::{AdapterFactory, AdapterRegistry};
pub use dry_run::DryRunAdapter;
