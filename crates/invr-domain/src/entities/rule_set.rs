//! Immutable, priority-ordered rule collection

use crate::entities::rule::{Rule, RuleKind};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Active rules sorted by priority, highest first
///
/// Rules sharing a priority keep their declaration order. A rule set is
/// built once per load and never mutated; reloads build a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate, drop inactive rules and sort
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.id.as_str()) {
                return Err(Error::invalid_rule(&rule.id, "duplicate rule id"));
            }
        }
        let mut rules: Vec<Rule> = rules.into_iter().filter(|r| r.active).collect();
        // `sort_by` is stable, so equal priorities keep declaration order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(Self { rules })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// All active rules in execution order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn completion_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.kind == RuleKind::Completion)
    }

    pub fn validation_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.kind.is_validation())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
