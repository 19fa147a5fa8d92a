// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Value objects and aggregates shared by every layer.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Catalog, environment, selection and adapter contracts

pub mod llm;
pub mod catalog;
pub mod model_table;
pub mod environment;
pub mod selection;
