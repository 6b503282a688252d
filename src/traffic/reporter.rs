//! Traffic reporter.
//!
//! Sums GOST's per-service transfer counters over a window and reports them to
//! the panel bucketed by rule type and keyed by rule id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::join;

use crate::observability::metrics;
use crate::panel::client::Management;
use crate::panel::types::{PanelResult, TrafficData};
use crate::sync::naming::parse_rule_info;
use crate::traffic::source::MetricsSource;

/// Transfer direction as seen by the GOST service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PromQL for bytes moved per service during the last `window_secs`.
pub fn traffic_query(window_secs: u64, direction: Direction) -> String {
    format!(
        "sum by (service) (increase(gost_service_transfer_{}_bytes_total[{}s]))",
        direction, window_secs
    )
}

/// Bytes per service name for one direction. A failed query yields an empty map.
pub async fn calc_traffic_by_service(
    source: &dyn MetricsSource,
    window_secs: u64,
    direction: Direction,
) -> HashMap<String, f64> {
    let expr = traffic_query(window_secs, direction);
    match source.query(&expr).await {
        Ok(samples) => {
            let mut by_service = HashMap::new();
            for sample in samples {
                *by_service.entry(sample.service).or_insert(0.0) += sample.value;
            }
            by_service
        }
        Err(e) => {
            tracing::error!(%direction, error = %e, "Traffic query failed");
            HashMap::new()
        }
    }
}

/// Merge both directions and bucket the totals by rule type.
///
/// Names that are not managed services, or whose type is not reported, are skipped.
pub fn bucket_traffic(inputs: HashMap<String, f64>, outputs: HashMap<String, f64>) -> TrafficData {
    let mut merged = inputs;
    for (service, bytes) in outputs {
        *merged.entry(service).or_insert(0.0) += bytes;
    }

    // Several services (one per node) can map to the same rule; sum before truncating.
    let mut totals: HashMap<(String, u64), f64> = HashMap::new();
    for (service, bytes) in merged {
        let info = match parse_rule_info(&service) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping traffic for unmanaged service");
                continue;
            }
        };
        if !TrafficData::tracks(&info.rule_type) {
            tracing::warn!(service = %service, rule_type = %info.rule_type, "Skipping traffic for unknown rule type");
            continue;
        }
        *totals.entry((info.rule_type, info.rule_id)).or_insert(0.0) += bytes;
    }

    let mut data = TrafficData::default();
    for ((rule_type, rule_id), bytes) in totals {
        if let Some(bucket) = data.bucket_mut(&rule_type) {
            bucket.insert(rule_id.to_string(), bytes as u64);
        }
    }
    data
}

/// Queries the metrics source and reports to the panel.
pub struct TrafficReporter {
    source: Arc<dyn MetricsSource>,
    panel: Arc<dyn Management>,
}

impl TrafficReporter {
    pub fn new(source: Arc<dyn MetricsSource>, panel: Arc<dyn Management>) -> Self {
        Self { source, panel }
    }

    /// Report traffic of the last `window_secs`. Returns what was sent.
    pub async fn report(&self, window_secs: u64) -> PanelResult<TrafficData> {
        let (inputs, outputs) = join(
            calc_traffic_by_service(self.source.as_ref(), window_secs, Direction::Input),
            calc_traffic_by_service(self.source.as_ref(), window_secs, Direction::Output),
        )
        .await;

        let data = bucket_traffic(inputs, outputs);
        tracing::info!(
            raw = data.raw.len(),
            tunnel = data.tunnel.len(),
            egress = data.egress.len(),
            "Reporting traffic"
        );
        self.panel.report_traffic(&data).await?;

        for (rule_type, bucket) in [("raw", &data.raw), ("tunnel", &data.tunnel), ("egress", &data.egress)] {
            metrics::record_traffic_bytes(rule_type, bucket.values().sum());
        }
        Ok(data)
    }
}
