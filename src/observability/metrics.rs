//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chain_rpc_requests_total` (counter): node calls by method, outcome
//! - `chain_rpc_request_duration_seconds` (histogram): node call latency
//! - `chain_transactions_submitted_total` (counter): broadcast, signed, failed
//! - `chain_block_reads_total` (counter): confirmation block reads by outcome
//! - `chain_confirmations_total` (counter): runs by terminal status
//! - `chain_confirmation_duration_seconds` (histogram): time to a terminal status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::blockchain::types::ConfirmationStatus;

/// Install the Prometheus recorder with a scrape endpoint at `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_request(method: &str, outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!(
        "chain_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("chain_rpc_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("chain_transactions_submitted_total", "outcome" => outcome).increment(1);
}

pub fn record_block_read(outcome: &'static str) {
    ::metrics::counter!("chain_block_reads_total", "outcome" => outcome).increment(1);
}

pub fn record_confirmation(status: ConfirmationStatus, elapsed: Duration) {
    ::metrics::counter!("chain_confirmations_total", "status" => status.as_str()).increment(1);
    ::metrics::histogram!("chain_confirmation_duration_seconds", "status" => status.as_str())
        .record(elapsed.as_secs_f64());
}
