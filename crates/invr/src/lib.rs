//! # Invoice rule engine
//!
//! Completes missing invoice fields and validates business constraints with
//! rules written in YAML and a small expression language.
//!
//! This crate is the public facade: it re-exports the layer crates and hosts
//! the `invr` command line tool.
//!
//! ## Example
//!
//! ```ignore
//! use invr::domain::Invoice;
//! use invr::engine::CancellationToken;
//! use invr::infrastructure::{ConfigLoader, init_app};
//!
//! let context = init_app(ConfigLoader::new().load()?).await?;
//! let mut invoice: Invoice = serde_json::from_str(input)?;
//! let outcome = context
//!     .engine()
//!     .process(&mut invoice, &context.rules().snapshot(), &CancellationToken::new())
//!     .await;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - records, rules, values and ports
//! - `engine` - expression evaluator, smart queries, completion and validation
//! - `infrastructure` - configuration, logging, rule files, reference data
//! - `cli` / `commands` - the `invr` binary

/// Domain layer - records, rules and ports
pub mod domain {
    pub use invr_domain::*;
}

/// Engine layer - evaluation and rule passes
pub mod engine {
    pub use invr_engine::*;
}

/// Infrastructure layer - config, logging, rule store and data adapters
pub mod infrastructure {
    pub use invr_infrastructure::*;
}

pub mod cli;
pub mod commands;

pub use invr_domain::{Invoice, Rule, RuleSet, Value};
pub use invr_engine::RuleEngine;
