//! Expression execution shared by the completion and validation passes

use crate::expression::{EvalError, EvalResult, Evaluator, Scope};
use crate::preprocessor::Preprocessor;
use invr_domain::entities::Rule;
use invr_domain::value::Value;
use invr_domain::value_objects::{ExecutionTrace, TraceEntry, TraceStatus};
use std::sync::Arc;

/// Preprocesses and evaluates rule expressions, tracing fallbacks
#[derive(Debug, Clone)]
pub(crate) struct RuleRunner {
    evaluator: Arc<Evaluator>,
    preprocessor: Arc<Preprocessor>,
}

impl RuleRunner {
    pub(crate) fn new(evaluator: Arc<Evaluator>, preprocessor: Arc<Preprocessor>) -> Self {
        Self {
            evaluator,
            preprocessor,
        }
    }

    /// Evaluate `source` for `rule`
    ///
    /// Every lookup or call that fell back to its default becomes a
    /// [`TraceStatus::Fallback`] entry.
    pub(crate) async fn value(
        &self,
        rule: &Rule,
        source: &str,
        scope: &Scope,
        item: Option<usize>,
        trace: &mut ExecutionTrace,
    ) -> EvalResult<Value> {
        let rewritten = self.preprocessor.rewrite(source, scope).await?;
        for note in rewritten.fallbacks {
            let mut entry = TraceEntry::new(&rule.id, &rule.name, rule.kind, TraceStatus::Fallback)
                .with_value(note.value)
                .with_reason(note.reason)
                .with_message(note.source);
            if let Some(index) = item {
                entry = entry.with_item(index);
            }
            trace.push(entry);
        }
        self.evaluator.evaluate(&rewritten.expression, scope)
    }

    /// Evaluate a boolean expression; any other result is a type mismatch
    pub(crate) async fn condition(
        &self,
        rule: &Rule,
        source: &str,
        scope: &Scope,
        item: Option<usize>,
        trace: &mut ExecutionTrace,
    ) -> EvalResult<bool> {
        match self.value(rule, source, scope, item, trace).await? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_mismatch(format!(
                "'{source}' must evaluate to a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluate the rule's gate; no gate always applies
    pub(crate) async fn gate(
        &self,
        rule: &Rule,
        scope: &Scope,
        item: Option<usize>,
        trace: &mut ExecutionTrace,
    ) -> EvalResult<bool> {
        match rule.gate() {
            Some(gate) => self.condition(rule, gate, scope, item, trace).await,
            None => Ok(true),
        }
    }
}

/// Trace entry for `rule`, optionally scoped to one collection element
pub(crate) fn entry(rule: &Rule, status: TraceStatus, item: Option<usize>) -> TraceEntry {
    let entry = TraceEntry::new(&rule.id, &rule.name, rule.kind, status);
    let entry = match rule.path() {
        Some(path) => entry.with_target(path),
        None => entry,
    };
    match item {
        Some(index) => entry.with_item(index),
        None => entry,
    }
}
