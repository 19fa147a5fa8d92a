// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Files
//!
//! On-disk records for named environments and global settings, their
//! discovery under the configuration directory, and the staleness markers
//! recorded for every file that was read.
//!
//! Layout:
//!
//! ```text
//! <config_dir>/
//!   global_settings.{json,yaml,yml}
//!   environments/
//!     staging.json      -> environment "staging"
//!     prod.yaml         -> environment "prod"
//! ```
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Parse and fingerprint configuration sources

use indexmap::IndexMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::domain::catalog::{ModelInfo, ProviderInfo};
use crate::domain::environment::{EnvironmentConfig, EnvironmentError, GlobalSettings};

pub const ENVIRONMENTS_DIR: &str = "environments";
pub const GLOBAL_SETTINGS_STEM: &str = "global_settings";

const SUPPORTED_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {error}")]
    Io { path: String, error: String },

    #[error("IO error writing {path}: {error}")]
    Write { path: String, error: String },

    #[error("Failed to parse {path}: {error}")]
    Parse { path: String, error: String },

    #[error("Invalid configuration in {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("Failed to serialize export: {0}")]
    Serialize(String),
}

/// File format, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(self, path: &Path, content: &[u8]) -> Result<T, ConfigError> {
        let parsed = match self {
            Self::Json => serde_json::from_slice(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_slice(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            error,
        })
    }
}

/// Fingerprint of a file at the time it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMarker {
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub digest: String,
}

impl SourceMarker {
    pub fn from_contents(modified: Option<SystemTime>, content: &[u8]) -> Self {
        Self {
            modified,
            len: content.len() as u64,
            digest: hex::encode(Sha256::digest(content)),
        }
    }

    /// Current marker of a file, `None` if it cannot be read
    pub fn probe(path: &Path) -> Option<Self> {
        let modified = fs::metadata(path).ok()?.modified().ok();
        let content = fs::read(path).ok()?;
        Some(Self::from_contents(modified, &content))
    }
}

/// A file read from disk together with its marker
#[derive(Debug)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub marker: SourceMarker,
}

pub fn read_source(path: &Path) -> Result<LoadedSource, ConfigError> {
    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    };
    let modified = fs::metadata(path).map_err(io_err)?.modified().ok();
    let content = fs::read(path).map_err(io_err)?;
    let marker = SourceMarker::from_contents(modified, &content);
    Ok(LoadedSource {
        path: path.to_path_buf(),
        content,
        marker,
    })
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Environment files under `<config_dir>/environments`, sorted by path
pub fn discover_environment_files(config_dir: &Path) -> Vec<PathBuf> {
    let dir = config_dir.join(ENVIRONMENTS_DIR);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_supported_extension(path))
        .collect();
    files.sort();
    files
}

/// First existing global settings file, JSON before YAML
pub fn discover_global_settings(config_dir: &Path) -> Option<PathBuf> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| config_dir.join(format!("{}.{}", GLOBAL_SETTINGS_STEM, ext)))
        .find(|path| path.is_file())
}

/// Environment name for a file: its stem
pub fn environment_name(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ModelRecord {
    #[serde(default)]
    name: Option<String>,
    max_tokens: u32,
    #[serde(default)]
    supports_vision: bool,
    #[serde(default)]
    cost_per_1k_tokens: f64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    base_url: String,
    #[serde(default = "default_true")]
    is_available: bool,
    #[serde(default)]
    extra_config: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    models: IndexMap<String, ModelRecord>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct EnvironmentRecord {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_provider: Option<String>,
    #[serde(default)]
    default_model: Option<String>,
    #[serde(default)]
    rate_limits: IndexMap<String, u32>,
    #[serde(default)]
    cost_limits: IndexMap<String, f64>,
    #[serde(default)]
    providers: IndexMap<String, ProviderRecord>,
}

impl EnvironmentRecord {
    fn into_environment(self, name: &str, path: &Path) -> Result<EnvironmentConfig, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: path.display().to_string(),
            reason,
        };

        let mut env = EnvironmentConfig::new(
            name,
            &self.description.unwrap_or_else(|| format!("Environment: {}", name)),
        );
        if let Some(provider) = self.default_provider {
            env.default_provider = provider;
        }
        if let Some(model) = self.default_model {
            env.default_model = model;
        }

        for (provider, limit) in &self.rate_limits {
            if *limit == 0 {
                return Err(invalid(format!("rate limit for '{}' must be > 0", provider)));
            }
        }
        for (provider, limit) in &self.cost_limits {
            if !limit.is_finite() || *limit < 0.0 {
                return Err(invalid(format!("cost limit for '{}' must be >= 0", provider)));
            }
        }
        env.rate_limits = self.rate_limits;
        env.cost_limits = self.cost_limits;

        for (key, record) in self.providers {
            let mut provider = ProviderInfo::new(
                record.name.as_deref().unwrap_or(&key),
                &record.api_key,
                &record.base_url,
            );
            // Availability requires a credential regardless of the flag
            provider.is_available = record.is_available && provider.has_credential();
            provider.extra_config = record.extra_config;

            for (model_key, m) in record.models {
                let info = ModelInfo::new(
                    m.name.as_deref().unwrap_or(&model_key),
                    m.max_tokens,
                    m.supports_vision,
                    m.cost_per_1k_tokens,
                    &m.description,
                );
                info.validate().map_err(|e| invalid(format!("provider '{}': {}", key, e)))?;
                provider.models.insert(model_key, info);
            }

            env.providers.insert(key, provider);
        }

        Ok(env)
    }
}

/// Parse a named-environment file; the environment name is the file stem
pub fn parse_environment(source: &LoadedSource) -> Result<EnvironmentConfig, ConfigError> {
    let name = environment_name(&source.path).ok_or_else(|| ConfigError::Invalid {
        path: source.path.display().to_string(),
        reason: "file name is not valid UTF-8".to_string(),
    })?;
    let record: EnvironmentRecord = ConfigFormat::from_path(&source.path)?.parse(&source.path, &source.content)?;
    record.into_environment(&name, &source.path)
}

pub fn parse_global_settings(source: &LoadedSource) -> Result<GlobalSettings, ConfigError> {
    let settings: GlobalSettings = ConfigFormat::from_path(&source.path)?.parse(&source.path, &source.content)?;
    settings.validate().map_err(|reason| ConfigError::Invalid {
        path: source.path.display().to_string(),
        reason,
    })?;
    Ok(settings)
}
