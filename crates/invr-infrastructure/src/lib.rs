//! # Invoice rule engine - infrastructure layer
//!
//! Everything around the engine that touches files, the environment or the
//! global subscriber.
//!
//! ### Configuration
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment loader: defaults, `invr.toml`, `INVR_*` overrides |
//! | [`constants`] | Centralized defaults |
//! | [`bootstrap`] | Builds the engine and rule store from configuration |
//!
//! ### Rules and data
//! | Module | Description |
//! |--------|-------------|
//! | [`rules`] | YAML rule source, snapshot store, file watcher |
//! | [`data`] | Reference tables, lookup cache, product catalog, named queries |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`logging`] | Structured logging with tracing |
//! | [`error_ext`] | Context helpers for foreign errors |

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod data;
pub mod error_ext;
pub mod logging;
pub mod rules;

pub use bootstrap::{AppContext, init_app};
pub use config::{AppConfig, ConfigLoader};
pub use error_ext::ErrorContext;
pub use rules::{RuleStore, YamlRuleSource};
