//! Field completion pass
//!
//! Completion rules run in priority order, each seeing the writes of the
//! rules before it. A rule that fails is traced and the pass moves on; the
//! pass itself never fails.

use crate::expression::Scope;
use crate::runner::{RuleRunner, entry};
use invr_domain::constants::{
    REASON_CONDITION_NOT_MET, REASON_EMPTY_COLLECTION, REASON_NULL_RESULT,
    REASON_TARGET_ALREADY_SET,
};
use invr_domain::entities::{CompletionMode, Rule, RuleSet};
use invr_domain::record::Record;
use invr_domain::value::Value;
use invr_domain::value_objects::{ExecutionTrace, FieldPath, TraceStatus};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Decision for one target before writing
enum Outcome {
    Write(Value),
    Skipped,
    Failed,
}

/// Computes missing fields of a record from completion rules
#[derive(Debug, Clone)]
pub struct FieldCompletionEngine {
    runner: RuleRunner,
    variables: BTreeMap<String, Value>,
}

impl FieldCompletionEngine {
    pub(crate) fn new(runner: RuleRunner, variables: BTreeMap<String, Value>) -> Self {
        Self { runner, variables }
    }

    /// Run every completion rule of `rules` against `record`
    ///
    /// Cancellation is checked before each rule; writes already made stay.
    pub async fn complete<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rules: &RuleSet,
        cancel: &CancellationToken,
    ) -> ExecutionTrace {
        let mut trace = ExecutionTrace::new();
        let tenant = record.tenant_id().map(str::to_string);

        for rule in rules
            .completion_rules()
            .filter(|r| r.applies_to_tenant(tenant.as_deref()))
        {
            if cancel.is_cancelled() {
                info!(rule_id = %rule.id, "Completion pass cancelled");
                trace.cancelled = true;
                break;
            }
            let path = match rule.target_path() {
                Ok(path) => path,
                Err(e) => {
                    trace.push(entry(rule, TraceStatus::Error, None).with_message(e.to_string()));
                    continue;
                }
            };
            match path {
                FieldPath::Scalar(segments) => {
                    self.apply_scalar(record, rule, &segments, &mut trace).await;
                }
                FieldPath::Collection { collection, field } => {
                    self.apply_collection(record, rule, &collection, &field, &mut trace)
                        .await;
                }
            }
        }

        debug!(
            entries = trace.len(),
            errors = trace.count(TraceStatus::Error),
            "Completion pass finished"
        );
        trace
    }

    fn scope<R: Record + ?Sized>(&self, record: &R) -> Scope {
        Scope::for_record(record).with_variables(self.variables.clone())
    }

    async fn apply_scalar<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rule: &Rule,
        segments: &[String],
        trace: &mut ExecutionTrace,
    ) {
        let scope = self.scope(record);
        let current = record.get_path(segments);
        if let Outcome::Write(value) = self.evaluate(rule, &scope, current, None, trace).await {
            match record.set_path(segments, value.clone()) {
                Ok(()) => trace.push(entry(rule, TraceStatus::Success, None).with_value(value)),
                Err(e) => {
                    trace.push(entry(rule, TraceStatus::Error, None).with_message(e.to_string()));
                }
            }
        }
    }

    async fn apply_collection<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rule: &Rule,
        collection: &str,
        field: &[String],
        trace: &mut ExecutionTrace,
    ) {
        let Some(len) = record.collection_len(collection) else {
            trace.push(
                entry(rule, TraceStatus::Error, None)
                    .with_message(format!("'{collection}' is not a collection")),
            );
            return;
        };
        if len == 0 {
            trace.push(
                entry(rule, TraceStatus::Skipped, None).with_reason(REASON_EMPTY_COLLECTION),
            );
            return;
        }

        let base = self.scope(record);
        let (mut written, mut skipped, mut failed) = (0usize, 0usize, 0usize);
        for index in 0..len {
            let item = record.item_value(collection, index).unwrap_or_default();
            let scope = base.with_item(item);
            let current = record.get_item_path(collection, index, field);
            match self.evaluate(rule, &scope, current, Some(index), trace).await {
                Outcome::Skipped => skipped += 1,
                Outcome::Failed => failed += 1,
                Outcome::Write(value) => {
                    match record.set_item_path(collection, index, field, value.clone()) {
                        Ok(()) => {
                            trace.push(
                                entry(rule, TraceStatus::Success, Some(index)).with_value(value),
                            );
                            written += 1;
                        }
                        Err(e) => {
                            trace.push(
                                entry(rule, TraceStatus::Error, Some(index))
                                    .with_message(e.to_string()),
                            );
                            failed += 1;
                        }
                    }
                }
            }
        }

        let status = if written > 0 {
            TraceStatus::Success
        } else if failed > 0 {
            TraceStatus::Error
        } else {
            TraceStatus::Skipped
        };
        trace.push(entry(rule, status, None).with_message(format!(
            "{written} written, {skipped} skipped, {failed} failed of {len}"
        )));
    }

    /// Gate, fill-only check and expression for one target
    ///
    /// Anything other than [`Outcome::Write`] has already been traced.
    async fn evaluate(
        &self,
        rule: &Rule,
        scope: &Scope,
        current: Option<Value>,
        item: Option<usize>,
        trace: &mut ExecutionTrace,
    ) -> Outcome {
        match self.runner.gate(rule, scope, item, trace).await {
            Ok(true) => {}
            Ok(false) => {
                trace.push(
                    entry(rule, TraceStatus::Skipped, item).with_reason(REASON_CONDITION_NOT_MET),
                );
                return Outcome::Skipped;
            }
            Err(e) => {
                trace.push(
                    entry(rule, TraceStatus::Error, item).with_message(format!("apply_to: {e}")),
                );
                return Outcome::Failed;
            }
        }

        if rule.mode == CompletionMode::Default && current.is_some_and(|v| !v.is_unset()) {
            trace.push(
                entry(rule, TraceStatus::Skipped, item).with_reason(REASON_TARGET_ALREADY_SET),
            );
            return Outcome::Skipped;
        }

        match self
            .runner
            .value(rule, &rule.rule_expression, scope, item, trace)
            .await
        {
            Ok(Value::Null) => {
                trace.push(entry(rule, TraceStatus::Skipped, item).with_reason(REASON_NULL_RESULT));
                Outcome::Skipped
            }
            Ok(value) => Outcome::Write(value),
            Err(e) => {
                trace.push(entry(rule, TraceStatus::Error, item).with_message(e.to_string()));
                Outcome::Failed
            }
        }
    }
}
