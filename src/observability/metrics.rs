//! Internal metrics.
//!
//! # Metrics
//! - `relay_sync_passes_total` (counter): sync passes by `outcome` (ok, aborted)
//! - `relay_sync_rule_syncs_total` (counter): rule syncs by `type` and `outcome`
//! - `relay_sync_writes_total` (counter): GOST writes by object `kind` and `op` (create, update)
//! - `relay_sync_deletes_total` (counter): orphan deletes by `kind` and `outcome`
//! - `relay_sync_traffic_bytes_total` (counter): reported bytes by rule `type`
//! - `relay_sync_managed_services` (gauge): services wanted by the last pass

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_pass(outcome: &'static str) {
    ::metrics::counter!("relay_sync_passes_total", "outcome" => outcome).increment(1);
}

pub fn record_rule_sync(rule_type: &str, outcome: &'static str) {
    ::metrics::counter!(
        "relay_sync_rule_syncs_total",
        "type" => rule_type.to_lowercase(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_write(kind: &'static str, op: &'static str) {
    ::metrics::counter!("relay_sync_writes_total", "kind" => kind, "op" => op).increment(1);
}

pub fn record_delete(kind: &'static str, outcome: &'static str) {
    ::metrics::counter!("relay_sync_deletes_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

pub fn record_traffic_bytes(rule_type: &str, bytes: u64) {
    ::metrics::counter!("relay_sync_traffic_bytes_total", "type" => rule_type.to_string())
        .increment(bytes);
}

pub fn record_managed_services(count: usize) {
    ::metrics::gauge!("relay_sync_managed_services").set(count as f64);
}
