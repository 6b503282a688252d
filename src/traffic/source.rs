//! Prometheus query API client.
//!
//! Only instant vector queries are used. Each sample is reduced to its
//! `service` label and numeric value.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const QUERY_PATH: &str = "/api/v1/query";

#[derive(Debug, Error)]
pub enum PromError {
    #[error("prometheus unreachable: {0}")]
    Transport(String),

    #[error("cannot decode prometheus reply ({reason}): {raw}")]
    Decode { reason: String, raw: String },

    #[error("prometheus query failed with HTTP {status}: {error}")]
    Query { status: u16, error: String },
}

pub type PromResult<T> = Result<T, PromError>;

/// One value of an instant vector, keyed by the `service` label.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub service: String,
    pub value: f64,
}

/// Where per-service traffic counters come from.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn query(&self, expr: &str) -> PromResult<Vec<Sample>>;
}

#[derive(Debug, Deserialize)]
struct QueryReply {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<VectorEntry>,
}

#[derive(Debug, Deserialize)]
struct VectorEntry {
    #[serde(default)]
    metric: std::collections::HashMap<String, String>,
    value: (f64, String),
}

/// Decode an instant query reply.
///
/// Entries without a `service` label or with a non-numeric value are dropped.
pub fn decode_samples(status: StatusCode, body: &str) -> PromResult<Vec<Sample>> {
    let reply: QueryReply = serde_json::from_str(body).map_err(|e| PromError::Decode {
        reason: e.to_string(),
        raw: body.to_string(),
    })?;

    if !status.is_success() || reply.status != "success" {
        return Err(PromError::Query {
            status: status.as_u16(),
            error: reply.error.unwrap_or(reply.status),
        });
    }

    let entries = reply.data.map(|d| d.result).unwrap_or_default();
    let samples = entries
        .into_iter()
        .filter_map(|entry| {
            let service = entry.metric.get("service")?.clone();
            match entry.value.1.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(Sample { service, value }),
                _ => {
                    tracing::warn!(service = %service, value = %entry.value.1, "Dropping non-numeric sample");
                    None
                }
            }
        })
        .collect();
    Ok(samples)
}

/// HTTP implementation of [`MetricsSource`].
#[derive(Debug, Clone)]
pub struct PrometheusApi {
    client: Client,
    endpoint: Url,
}

impl PrometheusApi {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl MetricsSource for PrometheusApi {
    async fn query(&self, expr: &str) -> PromResult<Vec<Sample>> {
        let url = self
            .endpoint
            .join(QUERY_PATH)
            .map_err(|e| PromError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(&[("query", expr)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Prometheus request failed");
                PromError::Transport(e.to_string())
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PromError::Transport(e.to_string()))?;

        decode_samples(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vector() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"service": "rule-5-raw-node-1"}, "value": [1700000000.123, "1024.5"]},
                    {"metric": {}, "value": [1700000000.123, "7"]},
                    {"metric": {"service": "rule-6-raw-node-1"}, "value": [1700000000.123, "NaN"]}
                ]
            }
        }"#;
        let samples = decode_samples(StatusCode::OK, body).unwrap();
        assert_eq!(
            samples,
            vec![Sample { service: "rule-5-raw-node-1".into(), value: 1024.5 }]
        );
    }

    #[test]
    fn test_decode_error_reply() {
        let body = r#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#;
        match decode_samples(StatusCode::BAD_REQUEST, body) {
            Err(PromError::Query { status, error }) => {
                assert_eq!(status, 400);
                assert_eq!(error, "parse error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_samples(StatusCode::OK, "<html>"),
            Err(PromError::Decode { .. })
        ));
    }

    #[test]
    fn test_empty_result() {
        let body = r#"{"status": "success", "data": {"resultType": "vector", "result": []}}"#;
        assert!(decode_samples(StatusCode::OK, body).unwrap().is_empty());
    }
}
