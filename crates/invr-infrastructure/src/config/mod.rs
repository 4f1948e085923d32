//! Configuration management
//!
//! Defaults, then a TOML file, then `INVR_*` environment overrides.

pub mod loader;
pub mod types;

pub use loader::{ConfigBuilder, ConfigLoader};
pub use types::{
    AppConfig, BatchConfig, FunctionsConfig, LoggingConfig, ReferenceDataConfig, RulesConfig,
    SmartQueryConfig,
};
