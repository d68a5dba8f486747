//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_transactions_total` (counter): submissions and queries by channel, kind, outcome
//! - `ledger_commit_latency_seconds` (histogram): ordering submit to commit event
//! - `ledger_batch_items_total` (counter): bulk operation items by operation, outcome
//! - `ledger_stage_duration_seconds` (histogram): startup stage durations
//!
//! # Design Decisions
//! - Outcome labels come from `OrchestratorError::kind`
//! - Exporter runs on the Tokio runtime that calls `init_metrics`

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a transaction outcome.
pub fn record_transaction(channel: &str, query_only: bool, outcome: &'static str) {
    let kind = if query_only { "query" } else { "invoke" };
    metrics::counter!(
        "ledger_transactions_total",
        "channel" => channel.to_string(),
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_commit_latency(channel: &str, elapsed: Duration) {
    metrics::histogram!("ledger_commit_latency_seconds", "channel" => channel.to_string())
        .record(elapsed.as_secs_f64());
}

/// Count the items of a bulk operation.
pub fn record_batch(operation: &'static str, total: usize, failed: usize) {
    metrics::counter!("ledger_batch_items_total", "operation" => operation, "outcome" => "ok")
        .increment((total - failed) as u64);
    metrics::counter!("ledger_batch_items_total", "operation" => operation, "outcome" => "failed")
        .increment(failed as u64);
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    metrics::histogram!("ledger_stage_duration_seconds", "stage" => stage).record(elapsed.as_secs_f64());
}
