//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count configuration loads by outcome and failure kind
//! - Track the store revision of the active snapshot
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `config_loads_total` (counter): loads by `outcome` (success/failure) and `kind`
//! - `config_revision` (gauge): store revision of the published snapshot
//! - `config_consecutive_failures` (gauge): failed refreshes since the last success
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are static strings from `LoadError::kind`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a successful load and the revision it published.
pub fn record_load_success(revision: i64) {
    ::metrics::counter!("config_loads_total", "outcome" => "success", "kind" => "none").increment(1);
    ::metrics::gauge!("config_revision").set(revision as f64);
    ::metrics::gauge!("config_consecutive_failures").set(0.0);
}

/// Record a failed load.
pub fn record_load_failure(kind: &'static str, consecutive_failures: u64) {
    ::metrics::counter!("config_loads_total", "outcome" => "failure", "kind" => kind).increment(1);
    ::metrics::gauge!("config_consecutive_failures").set(consecutive_failures as f64);
}
