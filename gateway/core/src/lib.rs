// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Provider/model routing core: catalog, selection, environment-scoped
//! configuration and the dispatcher that binds a selection to a backend.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root for the modelgate routing core

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
