//! Validation result types

use crate::entities::rule::Severity;
use crate::value_objects::trace::ExecutionTrace;
use serde::{Deserialize, Serialize};

/// A failed validation rule
///
/// Collection rules report a single issue listing every failing element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule_id: String,
    pub rule_name: String,
    pub field_path: String,
    pub message: String,
    pub severity: Severity,
    /// Indices of failing collection elements, empty for scalar rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_indices: Vec<usize>,
}

/// Per-pass counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Validation rules in the rule set
    pub total_rules: usize,
    /// Rules whose gate held and whose check ran
    pub evaluated: usize,
    pub passed: usize,
    pub failed: usize,
    /// Rules gated out
    pub skipped: usize,
    /// Rules that raised during evaluation (also counted as failed)
    pub errored: usize,
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no error-severity issue was reported
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
    pub trace: ExecutionTrace,
}

impl ValidationResult {
    /// Record an issue under its severity
    pub fn push_issue(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    /// Close the pass, deriving `valid`
    pub fn finish(&mut self) {
        self.valid = self.errors.is_empty();
    }

    /// Messages of all error-severity issues, in rule order
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}
