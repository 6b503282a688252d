//! GOST config API payloads and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message GOST returns for a successful write.
pub const MSG_OK: &str = "OK";

/// Message GOST returns when creating an object whose name is taken.
pub const MSG_DUPLICATED: &str = "object duplicated";

/// Errors that can occur while talking to the GOST control API.
#[derive(Debug, Error)]
pub enum GostError {
    /// Network failure, timeout, or unreadable body.
    #[error("GOST transport error: {0}")]
    Transport(String),

    /// Response body was not the JSON we expected.
    #[error("GOST response decode error: {reason}")]
    Decode { reason: String, raw: String },

    /// Create refused because an object with that name already exists.
    #[error("GOST object duplicated")]
    Duplicated,

    /// Any other non-success answer.
    #[error("GOST rejected request (HTTP {status}): {msg}")]
    Rejected { status: u16, msg: String },
}

/// Result type for GOST operations.
pub type GostResult<T> = Result<T, GostError>;

/// Object collections exposed under `/config/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    Chain,
    Limiter,
    CLimiter,
}

impl ResourceKind {
    /// Path segment under `/config`.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Service => "services",
            ResourceKind::Chain => "chains",
            ResourceKind::Limiter => "limiters",
            ResourceKind::CLimiter => "climiters",
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Service => "service",
            ResourceKind::Chain => "chain",
            ResourceKind::Limiter => "limiter",
            ResourceKind::CLimiter => "climiter",
        }
    }
}

/// Username/password pair used by relay handlers and connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Handler section of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

/// Listener section of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    #[serde(rename = "type")]
    pub kind: String,
}

/// A named address, used for forwarder targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardNode {
    pub name: String,
    pub addr: String,
}

/// Forwarder section of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    pub nodes: Vec<ForwardNode>,
}

/// A GOST service, as read from the snapshot or written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub addr: String,
    pub handler: HandlerConfig,
    pub listener: ListenerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<ForwarderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observer: Option<String>,
}

impl ServiceConfig {
    /// Port part of the listen address (`":9000"` → `"9000"`).
    pub fn port(&self) -> &str {
        self.addr.rsplit_once(':').map(|(_, port)| port).unwrap_or("")
    }

    /// Forwarder target addresses in order.
    pub fn target_addrs(&self) -> Vec<&str> {
        self.forwarder
            .as_ref()
            .map(|f| f.nodes.iter().map(|n| n.addr.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Connector or dialer section of a chain node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plugin {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

/// A node inside a chain hop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainNode {
    pub name: String,
    pub addr: String,
    pub connector: Plugin,
    pub dialer: Plugin,
}

/// A hop of a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hop {
    pub name: String,
    pub nodes: Vec<ChainNode>,
}

/// A GOST chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub name: String,
    pub hops: Vec<Hop>,
}

impl ChainConfig {
    /// Address of the only node of the only hop, if the chain has that shape.
    pub fn single_relay_addr(&self) -> Option<&str> {
        match self.hops.as_slice() {
            [hop] => match hop.nodes.as_slice() {
                [node] => Some(node.addr.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A speed (`limiters`) or connection (`climiters`) limiter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub name: String,
    pub limits: Vec<String>,
}

/// Full `GET /config` snapshot. Only the collections this agent manages are decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    #[serde(deserialize_with = "null_as_empty")]
    pub services: Vec<ServiceConfig>,
    #[serde(deserialize_with = "null_as_empty")]
    pub chains: Vec<ChainConfig>,
    #[serde(deserialize_with = "null_as_empty")]
    pub limiters: Vec<LimiterConfig>,
    #[serde(deserialize_with = "null_as_empty")]
    pub climiters: Vec<LimiterConfig>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Any object that can be written to the config API.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Service(ServiceConfig),
    Chain(ChainConfig),
    Limiter(LimiterConfig),
    CLimiter(LimiterConfig),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Service(_) => ResourceKind::Service,
            Resource::Chain(_) => ResourceKind::Chain,
            Resource::Limiter(_) => ResourceKind::Limiter,
            Resource::CLimiter(_) => ResourceKind::CLimiter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Service(s) => &s.name,
            Resource::Chain(c) => &c.name,
            Resource::Limiter(l) | Resource::CLimiter(l) => &l.name,
        }
    }

    /// JSON body for POST/PUT.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Resource::Service(s) => serde_json::to_value(s),
            Resource::Chain(c) => serde_json::to_value(c),
            Resource::Limiter(l) | Resource::CLimiter(l) => serde_json::to_value(l),
        };
        // Plain structs of strings and vectors always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_decodes_gost_output() {
        let snapshot: ConfigSnapshot = serde_json::from_value(json!({
            "services": [{
                "name": "rule-2-tunnel-node-1",
                "addr": ":9000",
                "handler": {"type": "tcp", "chain": "rule-2-tunnel-node-1-chain", "retries": 0},
                "listener": {"type": "tcp"},
                "forwarder": {"nodes": [{"name": "rule-2-tunnel-node-1-target-0", "addr": "10.0.0.1:80"}]},
                "limiter": "rule-2-tunnel-node-1-speed-limiter",
                "status": {"state": "ready"}
            }],
            "chains": [{
                "name": "rule-2-tunnel-node-1-chain",
                "hops": [{"name": "h", "nodes": [{"name": "n", "addr": "relay:9999",
                    "connector": {"type": "relay"}, "dialer": {"type": "ws"}}]}]
            }],
            "limiters": null
        }))
        .unwrap();

        assert_eq!(snapshot.services.len(), 1);
        let svc = &snapshot.services[0];
        assert_eq!(svc.port(), "9000");
        assert_eq!(svc.target_addrs(), vec!["10.0.0.1:80"]);
        assert_eq!(svc.handler.chain.as_deref(), Some("rule-2-tunnel-node-1-chain"));
        assert_eq!(svc.climiter, None);
        assert_eq!(snapshot.chains[0].single_relay_addr(), Some("relay:9999"));
        assert!(snapshot.limiters.is_empty());
        assert!(snapshot.climiters.is_empty());
    }

    #[test]
    fn test_service_serialization_omits_absent_fields() {
        let svc = ServiceConfig {
            name: "s".into(),
            addr: ":1".into(),
            handler: HandlerConfig { kind: "relay".into(), ..Default::default() },
            listener: ListenerConfig { kind: "ws".into() },
            ..Default::default()
        };
        let value = Resource::Service(svc).to_json();
        assert_eq!(
            value,
            json!({"name": "s", "addr": ":1", "handler": {"type": "relay"}, "listener": {"type": "ws"}})
        );
    }

    #[test]
    fn test_single_relay_addr_requires_single_hop_and_node() {
        let node = ChainNode { addr: "a:1".into(), ..Default::default() };
        let mut chain = ChainConfig {
            name: "c".into(),
            hops: vec![Hop { name: "h".into(), nodes: vec![node.clone(), node.clone()] }],
        };
        assert_eq!(chain.single_relay_addr(), None);

        chain.hops[0].nodes.pop();
        assert_eq!(chain.single_relay_addr(), Some("a:1"));

        chain.hops.push(Hop::default());
        assert_eq!(chain.single_relay_addr(), None);
    }

    #[test]
    fn test_port_of_various_addrs() {
        let mut svc = ServiceConfig { addr: "0.0.0.0:8443".into(), ..Default::default() };
        assert_eq!(svc.port(), "8443");
        svc.addr = "[::]:53".into();
        assert_eq!(svc.port(), "53");
        svc.addr = "garbage".into();
        assert_eq!(svc.port(), "");
    }
}
