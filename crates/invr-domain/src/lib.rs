//! # Invoice rule engine - domain layer
//!
//! Records, rules and the value types shared by every other crate, plus the
//! ports the engine calls out through.
//!
//! - [`value`] - dynamic [`Value`] with exact decimal numbers
//! - [`entities`] - [`Invoice`], [`Rule`], [`RuleSet`]
//! - [`record`] - the [`Record`] trait: path-based reads and writes
//! - [`value_objects`] - field paths, query descriptors, traces, validation results
//! - [`ports`] - [`DataSource`], [`FunctionHost`], [`RuleSource`]

pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod record;
pub mod value;
pub mod value_objects;

pub use entities::{Invoice, InvoiceItem, Party, Rule, RuleKind, RuleSet};
pub use error::{Error, Result};
pub use ports::{DataSource, FunctionHost, RuleSource};
pub use record::Record;
pub use value::{Row, Value};
