//! Traffic reporting against fake Prometheus and panel HTTP servers.

use std::sync::Arc;

use serde_json::json;

use relay_sync::traffic::TrafficReporter;

mod common;
use common::{FakePanel, FakePrometheus, TOKEN};

#[tokio::test]
async fn test_traffic_is_merged_and_reported() {
    let prom = FakePrometheus::start(
        &[("rule-5-raw-node-1", 100.0), ("rule-2-tunnel-node-1", 4096.0)],
        &[("rule-5-raw-node-1", 50.0), ("rule-7-egress-node-1", 12.0)],
    )
    .await;
    let panel = FakePanel::start(Vec::new()).await;
    let reporter = TrafficReporter::new(Arc::new(prom.api()), Arc::new(panel.api()));

    let data = reporter.report(30).await.unwrap();
    assert_eq!(data.raw["5"], 150);

    let p = panel.state.lock().unwrap();
    assert_eq!(
        p.traffic,
        vec![json!({
            "node_id": 1,
            "token": TOKEN,
            "data": {
                "raw": {"5": 150},
                "tunnel": {"2": 4096},
                "egress": {"7": 12}
            }
        })]
    );

    let queries = prom.state.lock().unwrap().queries.clone();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().any(|q| q.contains("gost_service_transfer_input_bytes_total[30s]")));
    assert!(queries.iter().any(|q| q.contains("gost_service_transfer_output_bytes_total[30s]")));
}

#[tokio::test]
async fn test_failed_query_reports_other_direction() {
    let prom = FakePrometheus::start(&[("rule-5-raw-node-1", 100.0)], &[("rule-5-raw-node-1", 50.0)]).await;
    prom.state.lock().unwrap().fail_output = true;
    let panel = FakePanel::start(Vec::new()).await;
    let reporter = TrafficReporter::new(Arc::new(prom.api()), Arc::new(panel.api()));

    let data = reporter.report(30).await.unwrap();
    assert_eq!(data.raw["5"], 100);
    assert_eq!(panel.state.lock().unwrap().traffic.len(), 1);
}

#[tokio::test]
async fn test_unmanaged_services_are_ignored() {
    let prom = FakePrometheus::start(&[("manual", 1.0), ("rule-x-raw-node-1", 2.0)], &[]).await;
    let panel = FakePanel::start(Vec::new()).await;
    let reporter = TrafficReporter::new(Arc::new(prom.api()), Arc::new(panel.api()));

    let data = reporter.report(30).await.unwrap();
    assert!(data.is_empty());
    assert_eq!(
        panel.state.lock().unwrap().traffic[0]["data"],
        json!({"raw": {}, "tunnel": {}, "egress": {}})
    );
}
