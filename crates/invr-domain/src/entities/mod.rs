//! Domain entities

pub mod invoice;
pub mod rule;
pub mod rule_set;

pub use invoice::{Address, Invoice, InvoiceItem, Party};
pub use rule::{CompletionMode, Rule, RuleKind, Severity};
pub use rule_set::RuleSet;
