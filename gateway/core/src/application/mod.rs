// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod selector;
pub mod dispatcher;

pub use selector::{ModelSelector, ScoreWeights, SelectionError, SelectionPolicy};
pub use dispatcher::{Credentials, DispatchError, Dispatcher};
