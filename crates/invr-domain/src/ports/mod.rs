//! Ports implemented outside the domain
//!
//! | Port | Purpose |
//! |------|---------|
//! | [`DataSource`] | Answers structured reference-data lookups |
//! | [`FunctionHost`] | Executes auxiliary functions called from rule expressions |
//! | [`RuleSource`] | Produces a validated [`crate::entities::RuleSet`] |

pub mod data_source;
pub mod function_host;
pub mod rule_source;

pub use data_source::{DataSource, NullDataSource};
pub use function_host::{FunctionHost, NullFunctionHost};
pub use rule_source::RuleSource;
