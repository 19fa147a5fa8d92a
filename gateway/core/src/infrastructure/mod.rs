// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod clock;
pub mod credentials;
pub mod config_files;
pub mod config_store;
pub mod llm;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialSource, ProcessEnv, StaticEnv};
pub use config_files::ConfigError;
pub use config_store::{ConfigStore, ConfigStoreOptions};
