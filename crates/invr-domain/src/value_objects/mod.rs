//! Domain value objects

pub mod path;
pub mod query;
pub mod trace;
pub mod validation;

pub use path::FieldPath;
pub use query::{ConditionValue, QueryCondition, QueryDescriptor, QueryOperator};
pub use trace::{ExecutionTrace, TraceEntry, TraceStatus};
pub use validation::{ValidationIssue, ValidationResult, ValidationSummary};
