//! Rule engine facade
//!
//! Wires the evaluator, preprocessor and both rule passes over one data
//! source and one auxiliary function host.

use crate::completion::FieldCompletionEngine;
use crate::constants::{DEFAULT_CALL_TIMEOUT, DEFAULT_LOOKUP_TIMEOUT};
use crate::expression::{EvalResult, Evaluator, Scope};
use crate::preprocessor::{FallbackNote, Preprocessor};
use crate::runner::RuleRunner;
use crate::smart_query::{FieldDefaults, SmartQueryEngine};
use crate::validation::BusinessValidationEngine;
use invr_domain::entities::RuleSet;
use invr_domain::ports::{DataSource, FunctionHost, NullDataSource, NullFunctionHost};
use invr_domain::record::Record;
use invr_domain::value::Value;
use invr_domain::value_objects::{ExecutionTrace, ValidationResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of an ad-hoc expression evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: Value,
    /// Lookups and calls that fell back to their defaults
    pub fallbacks: Vec<FallbackNote>,
}

/// Completion followed by validation of the completed record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub completion: ExecutionTrace,
    pub validation: ValidationResult,
}

/// Runs completion and validation passes over records
#[derive(Debug, Clone)]
pub struct RuleEngine {
    evaluator: Arc<Evaluator>,
    preprocessor: Arc<Preprocessor>,
    completion: FieldCompletionEngine,
    validation: BusinessValidationEngine,
    variables: BTreeMap<String, Value>,
}

impl RuleEngine {
    pub fn builder() -> RuleEngineBuilder {
        RuleEngineBuilder::default()
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Fill missing fields of `record`
    pub async fn complete<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rules: &RuleSet,
    ) -> ExecutionTrace {
        self.completion
            .complete(record, rules, &CancellationToken::new())
            .await
    }

    pub async fn complete_with_cancel<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rules: &RuleSet,
        cancel: &CancellationToken,
    ) -> ExecutionTrace {
        self.completion.complete(record, rules, cancel).await
    }

    /// Check `record` without modifying it
    pub async fn validate<R: Record + ?Sized>(
        &self,
        record: &R,
        rules: &RuleSet,
    ) -> ValidationResult {
        self.validation
            .validate(record, rules, &CancellationToken::new())
            .await
    }

    pub async fn validate_with_cancel<R: Record + ?Sized>(
        &self,
        record: &R,
        rules: &RuleSet,
        cancel: &CancellationToken,
    ) -> ValidationResult {
        self.validation.validate(record, rules, cancel).await
    }

    /// Complete `record`, then validate the completed record
    pub async fn process<R: Record + ?Sized>(
        &self,
        record: &mut R,
        rules: &RuleSet,
        cancel: &CancellationToken,
    ) -> ProcessOutcome {
        let completion = self.completion.complete(record, rules, cancel).await;
        let validation = self.validation.validate(record, rules, cancel).await;
        ProcessOutcome {
            completion,
            validation,
        }
    }

    /// Evaluate one expression against `record`, smart queries and auxiliary calls included
    pub async fn evaluate<R: Record + ?Sized>(
        &self,
        expression: &str,
        record: &R,
    ) -> EvalResult<Evaluated> {
        let scope = Scope::for_record(record).with_variables(self.variables.clone());
        self.evaluate_in(expression, &scope).await
    }

    /// Evaluate one expression in an explicit scope
    pub async fn evaluate_in(&self, expression: &str, scope: &Scope) -> EvalResult<Evaluated> {
        let rewritten = self.preprocessor.rewrite(expression, scope).await?;
        let value = self.evaluator.evaluate(&rewritten.expression, scope)?;
        Ok(Evaluated {
            value,
            fallbacks: rewritten.fallbacks,
        })
    }
}

/// Builder for [`RuleEngine`]
pub struct RuleEngineBuilder {
    data_source: Arc<dyn DataSource>,
    functions: Arc<dyn FunctionHost>,
    field_defaults: FieldDefaults,
    lookup_timeout: Duration,
    call_timeout: Duration,
    variables: BTreeMap<String, Value>,
}

impl Default for RuleEngineBuilder {
    fn default() -> Self {
        Self {
            data_source: Arc::new(NullDataSource),
            functions: Arc::new(NullFunctionHost),
            field_defaults: FieldDefaults::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            variables: BTreeMap::new(),
        }
    }
}

impl RuleEngineBuilder {
    #[must_use]
    pub fn data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
        self.data_source = data_source;
        self
    }

    #[must_use]
    pub fn functions(mut self, functions: Arc<dyn FunctionHost>) -> Self {
        self.functions = functions;
        self
    }

    #[must_use]
    pub fn field_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.field_defaults = defaults;
        self
    }

    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Bind a `$name` variable for smart query conditions
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> RuleEngine {
        let evaluator = Arc::new(Evaluator::new());
        let queries = SmartQueryEngine::new(self.data_source)
            .with_defaults(self.field_defaults)
            .with_timeout(self.lookup_timeout);
        let preprocessor = Arc::new(
            Preprocessor::new(Arc::clone(&evaluator), queries, self.functions)
                .with_call_timeout(self.call_timeout),
        );
        let runner = RuleRunner::new(Arc::clone(&evaluator), Arc::clone(&preprocessor));
        RuleEngine {
            completion: FieldCompletionEngine::new(runner.clone(), self.variables.clone()),
            validation: BusinessValidationEngine::new(runner, self.variables.clone()),
            evaluator,
            preprocessor,
            variables: self.variables,
        }
    }
}
