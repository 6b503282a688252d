//! Management panel client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::panel::types::{
    PanelError, PanelResult, Rule, RuleStatus, StatusReport, TrafficData, TrafficReport,
};

const RULE_SYNC_PATH: &str = "/api/relay-rule-sync/";
const RULE_TRAFFIC_PATH: &str = "/api/relay-rule-traffic/";

/// Operations the agent needs from the management panel.
#[async_trait]
pub trait Management: Send + Sync {
    /// Rules currently assigned to this node.
    async fn fetch_relay_rules(&self) -> PanelResult<Vec<Rule>>;

    /// Report the activation status of one rule.
    async fn update_relay_rule_status(
        &self,
        rule_id: u64,
        rule_type: &str,
        status: RuleStatus,
    ) -> PanelResult<()>;

    /// Submit per-rule traffic totals.
    async fn report_traffic(&self, data: &TrafficData) -> PanelResult<()>;
}

#[derive(Debug, Deserialize)]
struct RulesReply {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    msg: String,
}

/// Decode the rule list, dropping entries that do not describe a valid rule.
pub fn decode_rules(body: &str) -> PanelResult<Vec<Rule>> {
    let reply: RulesReply = serde_json::from_str(body).map_err(|e| PanelError::Decode {
        reason: e.to_string(),
        raw: body.to_string(),
    })?;

    let rules = reply
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Rule>(value.clone()) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!(rule = %value, error = %e, "Dropping malformed relay rule");
                None
            }
        })
        .collect();
    Ok(rules)
}

/// HTTP implementation of [`Management`].
#[derive(Debug, Clone)]
pub struct PanelApi {
    client: Client,
    endpoint: Url,
    node_id: u64,
    token: String,
}

impl PanelApi {
    pub fn new(client: Client, endpoint: Url, node_id: u64, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            node_id,
            token: token.into(),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    fn url(&self, path: &str) -> PanelResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| PanelError::Transport(format!("invalid URL path '{}': {}", path, e)))
    }

    async fn send(request: RequestBuilder) -> PanelResult<(StatusCode, String)> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Panel request failed");
            PanelError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        Ok((status, text))
    }

    fn ensure_ok(status: StatusCode, body: &str) -> PanelResult<()> {
        if status == StatusCode::OK {
            return Ok(());
        }
        let msg = serde_json::from_str::<Reply>(body)
            .map(|r| r.msg)
            .unwrap_or_else(|_| body.to_string());
        Err(PanelError::Rejected {
            status: status.as_u16(),
            msg,
        })
    }
}

#[async_trait]
impl Management for PanelApi {
    async fn fetch_relay_rules(&self) -> PanelResult<Vec<Rule>> {
        let node_id = self.node_id.to_string();
        let request = self
            .client
            .get(self.url(RULE_SYNC_PATH)?)
            .query(&[("node_id", node_id.as_str()), ("token", self.token.as_str())]);
        let (status, body) = Self::send(request).await?;
        Self::ensure_ok(status, &body)?;
        decode_rules(&body)
    }

    async fn update_relay_rule_status(
        &self,
        rule_id: u64,
        rule_type: &str,
        status: RuleStatus,
    ) -> PanelResult<()> {
        let report = StatusReport {
            node_id: self.node_id,
            token: &self.token,
            id: rule_id,
            rule_type,
            status: status.code(),
        };
        let request = self.client.put(self.url(RULE_SYNC_PATH)?).json(&report);
        let (status, body) = Self::send(request).await?;
        Self::ensure_ok(status, &body)
    }

    async fn report_traffic(&self, data: &TrafficData) -> PanelResult<()> {
        let report = TrafficReport {
            node_id: self.node_id,
            token: &self.token,
            data,
        };
        let request = self.client.post(self.url(RULE_TRAFFIC_PATH)?).json(&report);
        let (status, body) = Self::send(request).await?;
        Self::ensure_ok(status, &body)
    }
}
