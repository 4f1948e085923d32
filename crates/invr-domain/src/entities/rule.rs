//! Rule definitions
//!
//! A rule is either a completion rule, which computes a value and writes it
//! into `target_field`, or a validation rule, which evaluates a boolean check
//! against `field_path` and reports `error_message` when the check fails.
//! Both may carry an `apply_to` gate; no gate means the rule always applies.

use crate::constants::DEFAULT_RULE_PRIORITY;
use crate::error::{Error, Result};
use crate::value_objects::FieldPath;
use serde::{Deserialize, Serialize};

/// What a rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Computes and writes a field value
    Completion,
    /// Boolean check; over a collection every gated element must pass
    Validation,
    /// Boolean check over a collection where one passing element suffices
    ValidationAny,
}

impl RuleKind {
    pub fn is_validation(self) -> bool {
        matches!(self, Self::Validation | Self::ValidationAny)
    }
}

/// Whether a completion rule may overwrite a populated target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Write only when the target is absent, null or empty
    #[default]
    #[serde(alias = "DEFAULT")]
    Default,
    /// Write every non-null result
    #[serde(alias = "OVERRIDE")]
    Override,
}

/// Severity of a failed validation rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    #[serde(alias = "ERROR")]
    Error,
    #[serde(alias = "WARNING", alias = "warn")]
    Warning,
}

/// A single completion or validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub kind: RuleKind,
    /// Gating expression; `None` means always applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub rule_expression: String,
    pub priority: i32,
    pub active: bool,
    #[serde(default)]
    pub mode: CompletionMode,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Restricts the rule to records of one tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl Rule {
    /// New active completion rule with default priority
    pub fn completion(
        id: impl Into<String>,
        name: impl Into<String>,
        target_field: impl Into<String>,
        rule_expression: impl Into<String>,
    ) -> Self {
        Self {
            target_field: Some(target_field.into()),
            ..Self::base(id.into(), name.into(), RuleKind::Completion, rule_expression.into())
        }
    }

    /// New active validation rule with default priority
    pub fn validation(
        id: impl Into<String>,
        name: impl Into<String>,
        field_path: impl Into<String>,
        rule_expression: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            field_path: Some(field_path.into()),
            error_message: Some(error_message.into()),
            ..Self::base(id.into(), name.into(), RuleKind::Validation, rule_expression.into())
        }
    }

    fn base(id: String, name: String, kind: RuleKind, rule_expression: String) -> Self {
        Self {
            id,
            name,
            kind,
            apply_to: None,
            target_field: None,
            field_path: None,
            error_message: None,
            rule_expression,
            priority: DEFAULT_RULE_PRIORITY,
            active: true,
            mode: CompletionMode::Default,
            severity: Severity::Error,
            description: None,
            tenant_id: None,
        }
    }

    /// Set the gate; blank text means no gate
    #[must_use]
    pub fn with_apply_to(mut self, apply_to: impl Into<String>) -> Self {
        self.apply_to = normalize_gate(Some(apply_to.into()));
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: CompletionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: RuleKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The gating expression, if any
    pub fn gate(&self) -> Option<&str> {
        self.apply_to
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Path the rule writes (completion) or reports against (validation)
    pub fn path(&self) -> Option<&str> {
        match self.kind {
            RuleKind::Completion => self.target_field.as_deref(),
            RuleKind::Validation | RuleKind::ValidationAny => self.field_path.as_deref(),
        }
    }

    /// Parsed form of [`Rule::path`]
    pub fn target_path(&self) -> Result<FieldPath> {
        let raw = self
            .path()
            .ok_or_else(|| Error::invalid_rule(&self.id, "rule has no target path"))?;
        FieldPath::parse(raw).map_err(|e| Error::invalid_rule(&self.id, e.to_string()))
    }

    /// Whether the rule applies to a record of the given tenant
    pub fn applies_to_tenant(&self, tenant: Option<&str>) -> bool {
        match (&self.tenant_id, tenant) {
            (None, _) => true,
            (Some(own), Some(other)) => own == other,
            (Some(_), None) => false,
        }
    }

    /// Check the structural invariants of the rule
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_rule(&self.name, "rule id is empty"));
        }
        if self.rule_expression.trim().is_empty() {
            return Err(Error::invalid_rule(&self.id, "rule_expression is empty"));
        }
        match self.kind {
            RuleKind::Completion => {
                if is_blank(self.target_field.as_deref()) {
                    return Err(Error::invalid_rule(
                        &self.id,
                        "completion rule requires target_field",
                    ));
                }
            }
            RuleKind::Validation | RuleKind::ValidationAny => {
                if is_blank(self.field_path.as_deref()) {
                    return Err(Error::invalid_rule(
                        &self.id,
                        "validation rule requires field_path",
                    ));
                }
                if is_blank(self.error_message.as_deref()) {
                    return Err(Error::invalid_rule(
                        &self.id,
                        "validation rule requires error_message",
                    ));
                }
            }
        }
        self.target_path().map(|_| ())
    }
}

/// Map blank gate text to `None`
pub fn normalize_gate(apply_to: Option<String>) -> Option<String> {
    apply_to
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
