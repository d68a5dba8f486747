//! Fan-out of independent tasks with an all-or-nothing barrier.
//!
//! Every task runs to completion; a failure never cancels its siblings.
//! The report keeps each item's outcome so callers can see what succeeded
//! before deciding how to handle the aggregate failure.

use futures_util::future::join_all;
use std::future::Future;

use crate::error::{BatchFailure, OrchestratorError, OrchestratorResult};
use crate::observability::metrics;

/// Outcomes of one bulk operation, in submission order.
#[derive(Debug)]
pub struct BatchReport<T> {
    operation: &'static str,
    outcomes: Vec<(String, OrchestratorResult<T>)>,
}

impl<T> BatchReport<T> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn outcomes(&self) -> &[(String, OrchestratorResult<T>)] {
        &self.outcomes
    }

    /// Succeed with every value, or fail naming every failed item.
    pub fn into_result(self) -> OrchestratorResult<Vec<(String, T)>> {
        let total = self.outcomes.len();
        let mut values = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (item, outcome) in self.outcomes {
            match outcome {
                Ok(value) => values.push((item, value)),
                Err(error) => failures.push(BatchFailure { item, error }),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            Err(OrchestratorError::AggregateBatchFailure {
                operation: self.operation,
                total,
                failures,
            })
        }
    }
}

/// Run all tasks concurrently and wait for every one of them.
pub async fn run_batch<T, F>(operation: &'static str, tasks: Vec<(String, F)>) -> BatchReport<T>
where
    F: Future<Output = OrchestratorResult<T>>,
{
    let (items, futures): (Vec<String>, Vec<F>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let outcomes: Vec<_> = items.into_iter().zip(results).collect();
    let report = BatchReport {
        operation,
        outcomes,
    };

    for (item, outcome) in report.outcomes() {
        if let Err(e) = outcome {
            tracing::warn!(operation, item = %item, error = %e, "Batch item failed");
        }
    }
    tracing::debug!(operation, total = report.total(), failed = report.failed(), "Batch complete");
    metrics::record_batch(operation, report.total(), report.failed());

    report
}
