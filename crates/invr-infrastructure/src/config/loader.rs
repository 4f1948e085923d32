//! Figment-based configuration loading
//!
//! Sources, later ones winning: built-in defaults, one TOML file, then
//! `INVR_*` environment variables.

use crate::config::AppConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use invr_domain::error::{Error, Result};
use invr_engine::MergeStrategy;
use std::env;
use std::path::{Path, PathBuf};

/// Reads an [`AppConfig`] from defaults, a TOML file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Explicit file; `None` searches the default locations
    file: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Read this file instead of searching; a missing file falls back to defaults
    #[must_use]
    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Prefix for overrides, `INVR` unless tests isolate themselves
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merge defaults, then the TOML file, then `<PREFIX>_*` variables
    ///
    /// Nested keys are split on `__`, so `INVR_SMART_QUERY__LOOKUP_TIMEOUT_MS`
    /// sets `smart_query.lookup_timeout_ms`. Relative rule, reference-data and
    /// log paths resolve against the directory of the file that was read.
    pub fn load(&self) -> Result<AppConfig> {
        let file = match &self.file {
            Some(path) if path.exists() => Some(path.clone()),
            Some(path) => {
                log_config_loaded(path, false);
                None
            }
            None => Self::search_default_locations(),
        };

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = &file {
            figment = figment.merge(Toml::file(path));
            log_config_loaded(path, true);
        }
        let env = Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR);

        let mut config: AppConfig = figment
            .merge(env)
            .extract()
            .config_context("Failed to extract configuration")?;
        if let Some(base) = file.as_deref().and_then(Path::parent) {
            resolve_relative_paths(&mut config, base);
        }

        validate_app_config(&config)?;
        Ok(config)
    }

    /// Write `config` as pretty TOML
    pub fn save_to_file(&self, config: &AppConfig, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(config).config_context("Cannot serialize configuration")?;
        std::fs::write(path, text).io_context(format!("Cannot write {}", path.display()))
    }

    /// `./invr.toml`, `./invr/invr.toml`, then the user config directory
    fn search_default_locations() -> Option<PathBuf> {
        let cwd = env::current_dir().ok()?;
        [Some(cwd.clone()), Some(cwd.join(DEFAULT_CONFIG_DIR))]
            .into_iter()
            .chain(std::iter::once(dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR))))
            .flatten()
            .map(|dir| dir.join(DEFAULT_CONFIG_FILENAME))
            .find(|path| path.is_file())
    }
}

fn resolve_relative_paths(config: &mut AppConfig, base: &Path) {
    if config.rules.path.is_relative() {
        config.rules.path = base.join(&config.rules.path);
    }
    if config.reference_data.path.is_relative() {
        config.reference_data.path = base.join(&config.reference_data.path);
    }
    if let Some(file) = config.logging.file_output.as_mut().filter(|p| p.is_relative()) {
        *file = base.join(&*file);
    }
}

/// Reject zero limits, unknown log levels and unusable merge settings
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;

    let smart_query = &config.smart_query;
    let cache = smart_query.cache_enabled;
    let checks = [
        (
            smart_query.lookup_timeout_ms == 0,
            "smart_query.lookup_timeout_ms must be greater than 0",
        ),
        (
            cache && smart_query.cache_ttl_secs == 0,
            "smart_query.cache_ttl_secs must be greater than 0 when the cache is enabled",
        ),
        (
            cache && smart_query.cache_max_entries == 0,
            "smart_query.cache_max_entries must be greater than 0 when the cache is enabled",
        ),
        (
            config.functions.call_timeout_ms == 0,
            "functions.call_timeout_ms must be greater than 0",
        ),
        (
            config.batch.concurrency == 0,
            "batch.concurrency must be greater than 0",
        ),
        (
            config.batch.max_items_per_invoice == Some(0),
            "batch.max_items_per_invoice must be greater than 0",
        ),
    ];
    if let Some((_, message)) = checks.iter().find(|(failed, _)| *failed) {
        return Err(Error::configuration(*message));
    }
    config.batch.merge_plan().map(|_| ())
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// In-code [`AppConfig`] for tests and embedders, skipping files and the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule file or directory
    #[must_use]
    pub fn with_rules_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.rules.path = path.into();
        self
    }

    /// Enable or disable rule hot reload
    #[must_use]
    pub fn with_rule_watch(mut self, watch: bool) -> Self {
        self.config.rules.watch = watch;
        self
    }

    /// Set the reference data file
    #[must_use]
    pub fn with_reference_data<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.reference_data.path = path.into();
        self
    }

    /// Set smart-query configuration
    #[must_use]
    pub fn with_smart_query(mut self, smart_query: crate::config::SmartQueryConfig) -> Self {
        self.config.smart_query = smart_query;
        self
    }

    /// Set batch concurrency
    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.config.batch.concurrency = concurrency;
        self
    }

    /// Set the batch merge strategy and its extra grouping paths
    #[must_use]
    pub fn with_merge(mut self, strategy: MergeStrategy, keys: &[&str]) -> Self {
        self.config.batch.merge_strategy = strategy;
        self.config.batch.merge_keys = keys.iter().map(|key| (*key).to_string()).collect();
        self
    }

    /// Split batch records holding more line items than `max_items`
    #[must_use]
    pub fn with_max_items_per_invoice(mut self, max_items: usize) -> Self {
        self.config.batch.max_items_per_invoice = Some(max_items);
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
