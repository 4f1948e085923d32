//! # Invoice rule engine - evaluation layer
//!
//! Turns rule text into record changes and validation verdicts.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`expression`] | Parser and evaluator for the rule expression language |
//! | [`smart_query`] | `db.table.field[conditions]` lookups |
//! | [`preprocessor`] | Replaces lookups and auxiliary calls with literals |
//! | [`completion`] | Field completion pass |
//! | [`validation`] | Business validation pass |
//! | [`service`] | [`RuleEngine`] facade and builder |
//! | [`batch`] | Concurrent processing of many records |
//! | [`merge`] | Merging and splitting of completed records |
//! | [`authoring`] | Static checks for rule authors |
//!
//! ## Example
//!
//! ```
//! use invr_domain::{Invoice, Rule, RuleSet};
//! use invr_engine::RuleEngine;
//!
//! # tokio_test_block(async {
//! let rules = RuleSet::new(vec![Rule::completion(
//!     "currency",
//!     "Default currency",
//!     "currency",
//!     "'CNY'",
//! )])
//! .unwrap();
//! let engine = RuleEngine::builder().build();
//! let mut invoice = Invoice::new("INV-1");
//! engine.complete(&mut invoice, &rules).await;
//! assert_eq!(invoice.currency.as_deref(), Some("CNY"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod authoring;
pub mod batch;
pub mod completion;
pub mod constants;
pub mod expression;
pub mod merge;
pub mod preprocessor;
mod runner;
mod scan;
pub mod service;
pub mod smart_query;
pub mod validation;

pub use authoring::{DiagnosticLevel, RuleDiagnostic, check_rule, check_rules};
pub use batch::{BatchProcessor, BatchReport, RecordFailure, RecordOutcome};
pub use completion::FieldCompletionEngine;
pub use expression::{EvalError, EvalResult, Evaluator, Scope};
pub use merge::{MergePlan, MergeStrategy, Mergeable, Merged};
pub use preprocessor::{FallbackNote, Preprocessor, Rewritten};
pub use service::{Evaluated, ProcessOutcome, RuleEngine, RuleEngineBuilder};
pub use smart_query::{FieldDefaults, Resolution, SmartQueryEngine};
pub use tokio_util::sync::CancellationToken;
pub use validation::BusinessValidationEngine;
