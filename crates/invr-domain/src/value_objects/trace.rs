//! Execution trace of a rule pass

use crate::entities::rule::RuleKind;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Outcome of one rule (or one rule on one element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Value written / check passed
    Success,
    /// Rule not applied (gate false, target already set, null result)
    Skipped,
    /// Validation check evaluated to false
    Failed,
    /// Expression or write raised an error
    Error,
    /// A lookup or auxiliary call fell back to its declared default
    Fallback,
}

/// One line of the execution trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rule_id: String,
    pub rule_name: String,
    pub kind: RuleKind,
    pub status: TraceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Collection element the entry refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Machine-readable reason for skips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TraceEntry {
    pub fn new(rule_id: &str, rule_name: &str, kind: RuleKind, status: TraceStatus) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            kind,
            status,
            target: None,
            item_index: None,
            value: None,
            reason: None,
            message: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_item(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Ordered trace of a completion or validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub entries: Vec<TraceEntry>,
    /// Pass stopped early because cancellation was requested
    pub cancelled: bool,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded for a given rule
    pub fn for_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a TraceEntry> + 'a {
        self.entries.iter().filter(move |e| e.rule_id == rule_id)
    }

    /// Number of entries with the given status
    pub fn count(&self, status: TraceStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}
