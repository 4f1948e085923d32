//! Business validation pass
//!
//! Validation never mutates the record. Each rule contributes at most one
//! issue: a collection rule aggregates its failing elements into a single
//! issue listing their indices.

use crate::constants::RULE_ERROR_PREFIX;
use crate::expression::{EvalError, Scope};
use crate::runner::{RuleRunner, entry};
use invr_domain::constants::{REASON_CONDITION_NOT_MET, REASON_EMPTY_COLLECTION};
use invr_domain::entities::{Rule, RuleKind, RuleSet};
use invr_domain::record::Record;
use invr_domain::value::Value;
use invr_domain::value_objects::{
    ExecutionTrace, FieldPath, TraceStatus, ValidationIssue, ValidationResult,
};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Verdict of one rule
enum Verdict {
    Passed,
    /// Gated out (or nothing to check)
    Skipped(&'static str),
    Failed {
        item_indices: Vec<usize>,
    },
    Errored {
        error: EvalError,
        item_indices: Vec<usize>,
    },
}

/// Checks a record against validation rules
#[derive(Debug, Clone)]
pub struct BusinessValidationEngine {
    runner: RuleRunner,
    variables: BTreeMap<String, Value>,
}

impl BusinessValidationEngine {
    pub(crate) fn new(runner: RuleRunner, variables: BTreeMap<String, Value>) -> Self {
        Self { runner, variables }
    }

    /// Run every validation rule of `rules` against `record`
    pub async fn validate<R: Record + ?Sized>(
        &self,
        record: &R,
        rules: &RuleSet,
        cancel: &CancellationToken,
    ) -> ValidationResult {
        let mut result = ValidationResult::default();
        let mut trace = ExecutionTrace::new();
        let scope = Scope::for_record(record).with_variables(self.variables.clone());
        let applicable: Vec<&Rule> = rules
            .validation_rules()
            .filter(|r| r.applies_to_tenant(record.tenant_id()))
            .collect();
        result.summary.total_rules = applicable.len();

        for rule in applicable {
            if cancel.is_cancelled() {
                info!(rule_id = %rule.id, "Validation pass cancelled");
                trace.cancelled = true;
                break;
            }
            let verdict = match rule.target_path() {
                Ok(FieldPath::Collection { collection, .. }) => {
                    self.check_collection(record, rule, &collection, &scope, &mut trace)
                        .await
                }
                Ok(FieldPath::Scalar(_)) => self.check_scalar(rule, &scope, &mut trace).await,
                Err(e) => Verdict::Errored {
                    error: EvalError::eval(e.to_string()),
                    item_indices: Vec::new(),
                },
            };
            record_verdict(rule, verdict, &mut result, &mut trace);
        }

        result.trace = trace;
        result.finish();
        debug!(
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validation pass finished"
        );
        result
    }

    async fn check_scalar(
        &self,
        rule: &Rule,
        scope: &Scope,
        trace: &mut ExecutionTrace,
    ) -> Verdict {
        match self.runner.gate(rule, scope, None, trace).await {
            Ok(true) => {}
            Ok(false) => return Verdict::Skipped(REASON_CONDITION_NOT_MET),
            Err(error) => {
                return Verdict::Errored {
                    error,
                    item_indices: Vec::new(),
                };
            }
        }
        match self
            .runner
            .condition(rule, &rule.rule_expression, scope, None, trace)
            .await
        {
            Ok(true) => Verdict::Passed,
            Ok(false) => Verdict::Failed {
                item_indices: Vec::new(),
            },
            Err(error) => Verdict::Errored {
                error,
                item_indices: Vec::new(),
            },
        }
    }

    /// Check every gated element
    ///
    /// `validation` needs all of them to pass, `validation_any` at least one.
    /// A collection with no gated element passes.
    async fn check_collection<R: Record + ?Sized>(
        &self,
        record: &R,
        rule: &Rule,
        collection: &str,
        scope: &Scope,
        trace: &mut ExecutionTrace,
    ) -> Verdict {
        let Some(len) = record.collection_len(collection) else {
            return Verdict::Errored {
                error: EvalError::path_not_found(collection),
                item_indices: Vec::new(),
            };
        };
        if len == 0 {
            return Verdict::Skipped(REASON_EMPTY_COLLECTION);
        }

        let (mut checked, mut passed, mut plain_failures) = (0usize, 0usize, 0usize);
        let mut failing = Vec::new();
        let mut first_error = None;
        for index in 0..len {
            let item = record.item_value(collection, index).unwrap_or_default();
            let item_scope = scope.with_item(item);
            let outcome = match self.runner.gate(rule, &item_scope, Some(index), trace).await {
                Ok(false) => continue,
                Ok(true) => {
                    self.runner
                        .condition(rule, &rule.rule_expression, &item_scope, Some(index), trace)
                        .await
                }
                Err(e) => Err(e),
            };
            checked += 1;
            match outcome {
                Ok(true) => passed += 1,
                Ok(false) => {
                    trace.push(entry(rule, TraceStatus::Failed, Some(index)));
                    failing.push(index);
                    plain_failures += 1;
                }
                Err(e) => {
                    trace.push(
                        entry(rule, TraceStatus::Error, Some(index)).with_message(e.to_string()),
                    );
                    failing.push(index);
                    first_error.get_or_insert(e);
                }
            }
        }

        let satisfied = match rule.kind {
            RuleKind::ValidationAny => passed > 0,
            _ => failing.is_empty(),
        };
        if checked == 0 {
            return Verdict::Skipped(REASON_CONDITION_NOT_MET);
        }
        if satisfied {
            return Verdict::Passed;
        }
        // raised on every failing element: report the error instead of the message
        match first_error {
            Some(error) if plain_failures == 0 => Verdict::Errored {
                error,
                item_indices: failing,
            },
            _ => Verdict::Failed {
                item_indices: failing,
            },
        }
    }
}

fn record_verdict(
    rule: &Rule,
    verdict: Verdict,
    result: &mut ValidationResult,
    trace: &mut ExecutionTrace,
) {
    let summary = &mut result.summary;
    let issue = match verdict {
        Verdict::Passed => {
            summary.evaluated += 1;
            summary.passed += 1;
            trace.push(entry(rule, TraceStatus::Success, None));
            return;
        }
        Verdict::Skipped(reason) => {
            summary.skipped += 1;
            trace.push(entry(rule, TraceStatus::Skipped, None).with_reason(reason));
            return;
        }
        Verdict::Failed { item_indices } => {
            summary.evaluated += 1;
            summary.failed += 1;
            let message = rule.error_message.clone().unwrap_or_default();
            trace.push(entry(rule, TraceStatus::Failed, None).with_message(message.clone()));
            build_issue(rule, message, item_indices)
        }
        Verdict::Errored {
            error,
            item_indices,
        } => {
            summary.evaluated += 1;
            summary.failed += 1;
            summary.errored += 1;
            let message = format!("{RULE_ERROR_PREFIX} in '{}': {error}", rule.name);
            trace.push(entry(rule, TraceStatus::Error, None).with_message(message.clone()));
            build_issue(rule, message, item_indices)
        }
    };
    result.push_issue(issue);
}

fn build_issue(rule: &Rule, message: String, item_indices: Vec<usize>) -> ValidationIssue {
    ValidationIssue {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        field_path: rule.path().unwrap_or_default().to_string(),
        message,
        severity: rule.severity,
        item_indices,
    }
}
