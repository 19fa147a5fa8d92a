// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Store
//!
//! Hot-reloadable, environment-scoped configuration. Sources are merged into
//! an immutable [`Snapshot`] that is swapped atomically; readers clone the
//! current `Arc` and never observe a half-built configuration.
//!
//! Load order:
//! 1. Credential variables -> implicit `default` environment
//! 2. `<config_dir>/environments/*.{json,yaml,yml}` (a file named `default`
//!    replaces the variable-derived one)
//! 3. `<config_dir>/global_settings.{json,yaml,yml}`
//!
//! Read paths run a staleness check first. Once the reload interval has
//! elapsed since the last reload, every check probes the sources and reloads
//! when a tracked file changed, vanished or a new file appeared.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Own configuration state shared by selector and dispatcher

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::config_files::{
    discover_environment_files, discover_global_settings, parse_environment, parse_global_settings,
    read_source, ConfigError, SourceMarker,
};
use super::credentials::{load_base_environment, CredentialSource, ProcessEnv};
use crate::domain::catalog::{Catalog, ProviderInfo};
use crate::domain::environment::{
    EnvironmentConfig, EnvironmentError, EnvironmentStats, GlobalSettings, DEFAULT_ENVIRONMENT,
};
use crate::domain::model_table::ModelTable;

#[derive(Debug, Clone)]
pub struct ConfigStoreOptions {
    pub config_dir: PathBuf,

    /// Minimum time between reloads
    pub reload_interval: Duration,
}

impl Default for ConfigStoreOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("./config"),
            reload_interval: Duration::from_secs(300),
        }
    }
}

impl ConfigStoreOptions {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = interval;
        self
    }
}

/// One fully-built configuration generation
#[derive(Debug)]
pub struct Snapshot {
    environments: IndexMap<String, EnvironmentConfig>,
    catalogs: HashMap<String, Arc<Catalog>>,
    global_settings: GlobalSettings,

    /// Every discovered file; `None` when it could not be read
    sources: BTreeMap<PathBuf, Option<SourceMarker>>,
}

impl Snapshot {
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    pub fn global_settings(&self) -> &GlobalSettings {
        &self.global_settings
    }

    fn initial_active(&self) -> String {
        if self.environments.contains_key(DEFAULT_ENVIRONMENT) {
            DEFAULT_ENVIRONMENT.to_string()
        } else {
            self.environments
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
        }
    }
}

pub struct ConfigStore {
    options: ConfigStoreOptions,
    clock: Arc<dyn Clock>,
    credentials: Arc<dyn CredentialSource>,
    table: Arc<ModelTable>,

    snapshot: RwLock<Arc<Snapshot>>,
    active: RwLock<String>,
    last_reload: Mutex<Instant>,

    /// Single-writer guard for reloads
    reload_guard: Mutex<()>,

    /// Serializes environment switches against active-name fixups
    switch_lock: Mutex<()>,
}

impl ConfigStore {
    /// Store reading credentials from the process environment
    pub fn new(options: ConfigStoreOptions) -> Self {
        Self::with_components(
            options,
            Arc::new(SystemClock),
            Arc::new(ProcessEnv),
            Arc::new(ModelTable::builtin()),
        )
    }

    pub fn with_components(
        options: ConfigStoreOptions,
        clock: Arc<dyn Clock>,
        credentials: Arc<dyn CredentialSource>,
        table: Arc<ModelTable>,
    ) -> Self {
        let snapshot = build_snapshot(&options.config_dir, credentials.as_ref(), &table);
        let active = snapshot.initial_active();
        let now = clock.now();

        info!(
            "Configuration loaded from {}: {} environment(s), active '{}'",
            options.config_dir.display(),
            snapshot.environments.len(),
            active
        );

        Self {
            options,
            clock,
            credentials,
            table,
            snapshot: RwLock::new(Arc::new(snapshot)),
            active: RwLock::new(active),
            last_reload: Mutex::new(now),
            reload_guard: Mutex::new(()),
            switch_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &ConfigStoreOptions {
        &self.options
    }

    pub fn model_table(&self) -> Arc<ModelTable> {
        self.table.clone()
    }

    /// Current snapshot without a staleness check
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Current snapshot after a staleness check
    fn current(&self) -> Arc<Snapshot> {
        self.refresh_if_stale();
        self.snapshot()
    }

    /// Reload unconditionally
    pub fn reload(&self) {
        let _guard = self.reload_guard.lock();
        self.load_and_swap();
        *self.last_reload.lock() = self.clock.now();
    }

    fn refresh_if_stale(&self) {
        let now = self.clock.now();
        let since_reload = now.saturating_duration_since(*self.last_reload.lock());
        if since_reload < self.options.reload_interval {
            return;
        }

        // A concurrent reload is already in flight; keep the current snapshot
        let Some(_guard) = self.reload_guard.try_lock() else {
            return;
        };

        if self.sources_changed(&self.snapshot()) {
            info!("Configuration sources changed, reloading");
            self.load_and_swap();
            *self.last_reload.lock() = now;
        } else {
            debug!("Configuration sources unchanged");
        }
    }

    fn sources_changed(&self, snapshot: &Snapshot) -> bool {
        let dir = &self.options.config_dir;
        let mut discovered = discover_environment_files(dir);
        discovered.extend(discover_global_settings(dir));

        if discovered.len() != snapshot.sources.len()
            || discovered.iter().any(|p| !snapshot.sources.contains_key(p))
        {
            return true;
        }

        snapshot
            .sources
            .iter()
            .any(|(path, marker)| SourceMarker::probe(path) != *marker)
    }

    fn load_and_swap(&self) {
        let next = Arc::new(build_snapshot(
            &self.options.config_dir,
            self.credentials.as_ref(),
            &self.table,
        ));

        let _switch = self.switch_lock.lock();
        *self.snapshot.write() = next.clone();

        let mut active = self.active.write();
        if !next.environments.contains_key(active.as_str()) {
            let fallback = next.initial_active();
            warn!(
                "Active environment '{}' no longer exists, falling back to '{}'",
                active, fallback
            );
            *active = fallback;
        }

        info!(
            "Configuration reloaded: {} environment(s), active '{}'",
            next.environments.len(),
            active
        );
    }

    fn resolve_name(&self, environment: Option<&str>) -> String {
        environment
            .map(str::to_string)
            .unwrap_or_else(|| self.active.read().clone())
    }

    /// Provider configuration for the requested (or active) environment,
    /// falling back to `default` when that environment does not exist
    pub fn provider_config(&self, provider: &str, environment: Option<&str>) -> Option<ProviderInfo> {
        let snapshot = self.current();
        let name = self.resolve_name(environment);
        let catalog = snapshot
            .catalogs
            .get(&name)
            .or_else(|| snapshot.catalogs.get(DEFAULT_ENVIRONMENT))?;
        catalog.provider_info(provider).cloned()
    }

    pub fn environment_config(&self, environment: Option<&str>) -> Option<EnvironmentConfig> {
        let snapshot = self.current();
        snapshot.environments.get(&self.resolve_name(environment)).cloned()
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.current().environments.keys().cloned().collect()
    }

    pub fn active_environment(&self) -> String {
        self.active.read().clone()
    }

    pub fn global_settings(&self) -> GlobalSettings {
        self.current().global_settings.clone()
    }

    pub fn environment_stats(&self, environment: Option<&str>) -> Option<EnvironmentStats> {
        let snapshot = self.current();
        snapshot
            .environments
            .get(&self.resolve_name(environment))
            .map(EnvironmentConfig::stats)
    }

    pub fn available_providers(&self, environment: Option<&str>) -> Vec<String> {
        let snapshot = self.current();
        snapshot
            .environments
            .get(&self.resolve_name(environment))
            .map(EnvironmentConfig::available_providers)
            .unwrap_or_default()
    }

    /// Switch the active environment; unknown names leave it untouched
    pub fn switch_environment(&self, environment: &str) -> bool {
        self.refresh_if_stale();
        let _switch = self.switch_lock.lock();

        // Reloads swap under the switch lock, so this is the snapshot the
        // active name must belong to
        let snapshot = self.snapshot();
        if !snapshot.environments.contains_key(environment) {
            error!("Environment not found: {}", environment);
            return false;
        }

        let mut active = self.active.write();
        let previous = std::mem::replace(&mut *active, environment.to_string());
        info!("Switched environment: {} -> {}", previous, environment);
        true
    }

    pub fn validate_environment(&self, environment: &str) -> Result<(), EnvironmentError> {
        let snapshot = self.current();
        snapshot
            .environments
            .get(environment)
            .ok_or_else(|| EnvironmentError::EnvUnknown(environment.to_string()))?
            .validate()
    }

    /// Pretty JSON of an environment with every credential masked,
    /// optionally written to `path`
    pub fn export_environment(&self, environment: &str, path: Option<&Path>) -> Result<String, ConfigError> {
        let snapshot = self.current();
        let env = snapshot
            .environments
            .get(environment)
            .ok_or_else(|| EnvironmentError::EnvUnknown(environment.to_string()))?;

        let json = serde_json::to_string_pretty(&env.redacted())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(path) = path {
            std::fs::write(path, &json).map_err(|e| ConfigError::Write {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            info!("Exported environment '{}' to {}", environment, path.display());
        }

        Ok(json)
    }

    /// Catalog of the active environment
    pub fn catalog(&self) -> Arc<Catalog> {
        let snapshot = self.current();
        let name = self.active_environment();
        snapshot
            .catalogs
            .get(&name)
            .or_else(|| snapshot.catalogs.get(DEFAULT_ENVIRONMENT))
            .cloned()
            .unwrap_or_else(|| {
                Arc::new(Catalog::build(&EnvironmentConfig::unusable_fallback(), self.table.clone()))
            })
    }

    pub fn catalog_for(&self, environment: &str) -> Option<Arc<Catalog>> {
        self.current().catalogs.get(environment).cloned()
    }
}

fn build_snapshot(config_dir: &Path, credentials: &dyn CredentialSource, table: &Arc<ModelTable>) -> Snapshot {
    let mut environments = IndexMap::new();
    let mut sources = BTreeMap::new();

    if let Some(base) = load_base_environment(credentials) {
        info!(
            "Loaded environment '{}' from credential variables ({} providers)",
            base.name,
            base.providers.len()
        );
        environments.insert(base.name.clone(), base);
    }

    for path in discover_environment_files(config_dir) {
        let source = match read_source(&path) {
            Ok(source) => source,
            Err(e) => {
                error!("Skipping environment file: {}", e);
                sources.insert(path, None);
                continue;
            }
        };
        sources.insert(path.clone(), Some(source.marker.clone()));

        match parse_environment(&source) {
            Ok(env) => {
                info!(
                    "Loaded environment '{}' from {} ({} providers)",
                    env.name,
                    path.display(),
                    env.providers.len()
                );
                if let Some(replaced) = environments.insert(env.name.clone(), env) {
                    debug!("Environment '{}' overridden by {}", replaced.name, path.display());
                }
            }
            Err(e) => error!("Skipping environment file {}: {}", path.display(), e),
        }
    }

    let mut global_settings = GlobalSettings::default();
    if let Some(path) = discover_global_settings(config_dir) {
        match read_source(&path) {
            Ok(source) => {
                sources.insert(path.clone(), Some(source.marker.clone()));
                match parse_global_settings(&source) {
                    Ok(settings) => {
                        info!("Loaded global settings from {}", path.display());
                        global_settings = settings;
                    }
                    Err(e) => error!("Ignoring global settings, using defaults: {}", e),
                }
            }
            Err(e) => {
                error!("Ignoring global settings, using defaults: {}", e);
                sources.insert(path, None);
            }
        }
    }

    if environments.is_empty() {
        warn!("No configuration source produced an environment, using unusable fallback");
        let fallback = EnvironmentConfig::unusable_fallback();
        environments.insert(fallback.name.clone(), fallback);
    }

    let catalogs = environments
        .iter()
        .map(|(name, env)| (name.clone(), Arc::new(Catalog::build(env, table.clone()))))
        .collect();

    Snapshot {
        environments,
        catalogs,
        global_settings,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::credentials::StaticEnv;

    fn store(dir: &Path, env: StaticEnv) -> ConfigStore {
        ConfigStore::with_components(
            ConfigStoreOptions::new(dir),
            Arc::new(ManualClock::new()),
            Arc::new(env),
            Arc::new(ModelTable::builtin()),
        )
    }

    #[test]
    fn test_empty_sources_yield_unusable_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), StaticEnv::new());

        assert_eq!(store.environment_names(), vec!["default"]);
        assert_eq!(store.active_environment(), "default");
        let env = store.environment_config(None).unwrap();
        assert!(!env.usable);
        assert_eq!(
            store.validate_environment("default"),
            Err(EnvironmentError::NoProviders("default".into()))
        );
    }

    #[test]
    fn test_provider_config_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), StaticEnv::new().with("LLM_PROVIDERS_OPENAI_API_KEY", "sk-test"));

        let provider = store.provider_config("openai", Some("missing")).unwrap();
        assert_eq!(provider.api_key, "sk-test");
        assert!(provider.models.contains_key("gpt-4o"));
        assert!(store.provider_config("anthropic", None).is_none());
    }

    #[test]
    fn test_export_unknown_environment() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), StaticEnv::new());
        assert!(matches!(
            store.export_environment("nope", None),
            Err(ConfigError::Environment(EnvironmentError::EnvUnknown(_)))
        ));
    }
}
