//! Relay rule model and panel error definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the management panel.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Network failure or timeout.
    #[error("panel transport error: {0}")]
    Transport(String),

    /// Response body was not the JSON we expected.
    #[error("panel response decode error: {reason}")]
    Decode { reason: String, raw: String },

    /// Non-200 answer.
    #[error("panel rejected request (HTTP {status}): {msg}")]
    Rejected { status: u16, msg: String },
}

/// Result type for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;

/// Kind of relay rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Relay listener terminating tunnels from ingress nodes.
    Egress,
    /// Ingress forwarding through a relay chain to an egress node.
    Tunnel,
    /// Plain TCP port forwarding.
    Raw,
    /// Anything the panel sends that this agent does not implement.
    Other(String),
}

impl RuleType {
    /// Wire spelling, as sent by the panel and echoed back in status reports.
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::Egress => "Egress",
            RuleType::Tunnel => "Tunnel",
            RuleType::Raw => "Raw",
            RuleType::Other(s) => s,
        }
    }
}

impl From<String> for RuleType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Egress" => RuleType::Egress,
            "Tunnel" => RuleType::Tunnel,
            "Raw" => RuleType::Raw,
            _ => RuleType::Other(s),
        }
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RuleType::from)
    }
}

impl Serialize for RuleType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote relay reached by a tunnel rule, or the credentials an egress accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunnel {
    pub addr: String,
    pub username: String,
    pub password: String,
}

/// A relay rule assigned to this node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u64,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub listen_port: u16,
    /// Newline-delimited `host:port` list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: String,
    #[serde(default)]
    pub tunnel: Option<Tunnel>,
    #[serde(default)]
    pub ingress_node: Option<u64>,
    #[serde(default)]
    pub egress_node: Option<u64>,
    /// JSON-encoded speed/connection caps.
    #[serde(default, deserialize_with = "null_as_default")]
    pub limit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transport_type: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Rule {
    /// Forwarding targets in order, blank lines dropped.
    pub fn target_list(&self) -> Vec<String> {
        self.targets
            .split('\n')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Node this rule's service lives on, or `fallback` if the panel left it out.
    pub fn node_id(&self, fallback: u64) -> u64 {
        let node = match self.rule_type {
            RuleType::Egress => self.egress_node,
            _ => self.ingress_node,
        };
        node.unwrap_or(fallback)
    }
}

/// Status codes understood by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatus {
    Active = 3,
}

impl RuleStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Body of `PUT /api/relay-rule-sync/`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport<'a> {
    pub node_id: u64,
    pub token: &'a str,
    pub id: u64,
    #[serde(rename = "type")]
    pub rule_type: &'a str,
    pub status: u8,
}

/// Per-type byte counts keyed by rule id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficData {
    pub raw: BTreeMap<String, u64>,
    pub tunnel: BTreeMap<String, u64>,
    pub egress: BTreeMap<String, u64>,
}

impl TrafficData {
    /// Whether traffic for a lowercase rule type is reported.
    pub fn tracks(rule_type: &str) -> bool {
        matches!(rule_type, "raw" | "tunnel" | "egress")
    }

    /// Bucket for a lowercase rule type, if it is one of the reported kinds.
    pub fn bucket_mut(&mut self, rule_type: &str) -> Option<&mut BTreeMap<String, u64>> {
        match rule_type {
            "raw" => Some(&mut self.raw),
            "tunnel" => Some(&mut self.tunnel),
            "egress" => Some(&mut self.egress),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.tunnel.is_empty() && self.egress.is_empty()
    }
}

/// Body of `POST /api/relay-rule-traffic/`.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficReport<'a> {
    pub node_id: u64,
    pub token: &'a str,
    pub data: &'a TrafficData,
}
