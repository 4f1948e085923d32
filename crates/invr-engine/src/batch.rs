//! Batch processing
//!
//! Records of a batch run concurrently against one rule set snapshot, so a
//! reload during the batch never mixes rule versions. Results come back in
//! input order and a record whose task panics fails alone.
//!
//! With a [`MergePlan`] that merges or splits, the batch runs in three
//! phases: every record is completed, the completed records are merged and
//! split, and each resulting record is validated.

use crate::constants::DEFAULT_BATCH_CONCURRENCY;
use crate::merge::{MergePlan, Mergeable, Merged};
use crate::service::RuleEngine;
use futures::StreamExt;
use invr_domain::entities::RuleSet;
use invr_domain::value_objects::{ExecutionTrace, ValidationResult};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Processed record with the traces of both passes
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome<R> {
    /// Position in [`BatchReport::results`]
    pub index: usize,
    /// Input positions this record was built from
    pub sources: Vec<usize>,
    pub record: R,
    /// Completion traces of every source, in source order
    pub completion: ExecutionTrace,
    pub validation: ValidationResult,
}

/// Record whose processing task did not finish
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    /// Input position of the record (the first source after a merge)
    pub index: usize,
    pub message: String,
}

/// Result of one batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<R> {
    pub batch_id: Uuid,
    /// Records read
    pub inputs: usize,
    /// One entry per output record, ordered by first source
    pub results: Vec<Result<RecordOutcome<R>, RecordFailure>>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl<R> BatchReport<R> {
    /// Records that completed and passed validation
    pub fn valid_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.as_ref().is_ok_and(|o| o.validation.valid))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }
}

/// Runs completion and validation over many records with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<RuleEngine>,
    concurrency: usize,
    merge: MergePlan,
}

impl BatchProcessor {
    pub fn new(engine: Arc<RuleEngine>) -> Self {
        Self {
            engine,
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            merge: MergePlan::default(),
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Merge and split completed records before validating them
    #[must_use]
    pub fn with_merge(mut self, plan: MergePlan) -> Self {
        self.merge = plan;
        self
    }

    /// Complete and validate every record against `rules`
    ///
    /// Cancellation stops each in-flight record before its next rule; records
    /// not yet started return immediately with cancelled traces.
    pub async fn process<R>(
        &self,
        records: Vec<R>,
        rules: Arc<RuleSet>,
        cancel: CancellationToken,
    ) -> BatchReport<R>
    where
        R: Mergeable + 'static,
    {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let inputs = records.len();
        info!(
            %batch_id,
            records = inputs,
            rules = rules.len(),
            merge = %self.merge.strategy(),
            "Batch started"
        );

        let results = if self.merge.is_noop() {
            self.process_each(batch_id, records, &rules, &cancel).await
        } else {
            self.process_merged(batch_id, records, &rules, &cancel).await
        };

        let report = BatchReport {
            batch_id,
            inputs,
            results,
            cancelled: cancel.is_cancelled(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            %batch_id,
            records = inputs,
            outputs = report.results.len(),
            valid = report.valid_count(),
            failed = report.failure_count(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "Batch finished"
        );
        report
    }

    async fn process_each<R>(
        &self,
        batch_id: Uuid,
        records: Vec<R>,
        rules: &Arc<RuleSet>,
        cancel: &CancellationToken,
    ) -> Vec<Result<RecordOutcome<R>, RecordFailure>>
    where
        R: Mergeable + 'static,
    {
        let tasks = records.into_iter().enumerate().map(|(index, mut record)| {
            let engine = Arc::clone(&self.engine);
            let rules = Arc::clone(rules);
            let cancel = cancel.clone();
            let task = async move {
                let outcome = engine.process(&mut record, &rules, &cancel).await;
                RecordOutcome {
                    index,
                    sources: vec![index],
                    record,
                    completion: outcome.completion,
                    validation: outcome.validation,
                }
            };
            (index, task)
        });
        self.run_bounded(batch_id, tasks).await
    }

    async fn process_merged<R>(
        &self,
        batch_id: Uuid,
        records: Vec<R>,
        rules: &Arc<RuleSet>,
        cancel: &CancellationToken,
    ) -> Vec<Result<RecordOutcome<R>, RecordFailure>>
    where
        R: Mergeable + 'static,
    {
        let inputs = records.len();
        let tasks = records.into_iter().enumerate().map(|(index, mut record)| {
            let engine = Arc::clone(&self.engine);
            let rules = Arc::clone(rules);
            let cancel = cancel.clone();
            let task = async move {
                let trace = engine.complete_with_cancel(&mut record, &rules, &cancel).await;
                (record, trace)
            };
            (index, task)
        });

        let mut traces: Vec<Option<ExecutionTrace>> = vec![None; inputs];
        let mut completed = Vec::with_capacity(inputs);
        let mut ordered: Vec<(usize, Result<RecordOutcome<R>, RecordFailure>)> = Vec::new();
        for (index, result) in self.run_bounded(batch_id, tasks).await.into_iter().enumerate() {
            match result {
                Ok((record, trace)) => {
                    traces[index] = Some(trace);
                    completed.push((index, record));
                }
                Err(failure) => ordered.push((failure.index, Err(failure))),
            }
        }

        let merged = self.merge.apply(completed);
        info!(
            %batch_id,
            completed = inputs - ordered.len(),
            outputs = merged.len(),
            "Records merged"
        );

        let tasks = merged.into_iter().map(|Merged { sources, record }| {
            let engine = Arc::clone(&self.engine);
            let rules = Arc::clone(rules);
            let cancel = cancel.clone();
            let first = sources.first().copied().unwrap_or_default();
            let completion = combined_trace(&traces, &sources);
            let task = async move {
                let validation = engine.validate_with_cancel(&record, &rules, &cancel).await;
                RecordOutcome {
                    index: first,
                    sources,
                    record,
                    completion,
                    validation,
                }
            };
            (first, task)
        });
        for result in self.run_bounded(batch_id, tasks).await {
            let first = match &result {
                Ok(outcome) => outcome.index,
                Err(failure) => failure.index,
            };
            ordered.push((first, result));
        }

        // stable, so split parts keep their order
        ordered.sort_by_key(|(first, _)| *first);
        ordered
            .into_iter()
            .enumerate()
            .map(|(position, (_, result))| {
                result.map(|outcome| RecordOutcome {
                    index: position,
                    ..outcome
                })
            })
            .collect()
    }

    /// Spawn each task, at most `concurrency` at a time, keeping task order
    async fn run_bounded<T, F, I>(&self, batch_id: Uuid, tasks: I) -> Vec<Result<T, RecordFailure>>
    where
        I: Iterator<Item = (usize, F)>,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let spawned = tasks.map(|(index, task)| {
            let handle = tokio::spawn(task);
            async move { (index, handle.await) }
        });
        futures::stream::iter(spawned)
            .buffered(self.concurrency)
            .map(|(index, joined)| {
                joined.map_err(|e| {
                    warn!(%batch_id, index, error = %e, "Batch record task failed");
                    RecordFailure {
                        index,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
            .await
    }
}

fn combined_trace(traces: &[Option<ExecutionTrace>], sources: &[usize]) -> ExecutionTrace {
    let mut combined = ExecutionTrace::new();
    for trace in sources
        .iter()
        .filter_map(|&index| traces.get(index).and_then(Option::as_ref))
    {
        combined.entries.extend(trace.entries.iter().cloned());
        combined.cancelled |= trace.cancelled;
    }
    combined
}
