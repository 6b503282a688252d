//! GOST objects a rule should produce.

use crate::gost::types::{
    Auth, ChainConfig, ChainNode, ForwardNode, ForwarderConfig, HandlerConfig, Hop,
    LimiterConfig, ListenerConfig, Plugin, Resource, ServiceConfig,
};
use crate::panel::types::{Rule, Tunnel};
use crate::sync::limits::{parse_limits, RelayRuleLimit};
use crate::sync::naming::RuleNames;

/// GOST listener type for a declared transport.
///
/// Only WebSocket is known. Everything else maps to `"unknown"`, which no live
/// listener reports, so such egress rules are rewritten on every pass.
pub fn listener_type_for(transport: &str) -> &'static str {
    match transport {
        "WebSocket" => "ws",
        _ => "unknown",
    }
}

/// Listener actually written for an egress service. GOST has no "unknown"
/// listener, so unrecognized transports are written as WebSocket.
pub fn egress_listener_type(transport: &str) -> &'static str {
    match listener_type_for(transport) {
        "unknown" => "ws",
        known => known,
    }
}

/// Desired shape of one rule on this node.
#[derive(Debug, Clone)]
pub struct DesiredRule<'a> {
    pub rule: &'a Rule,
    pub names: RuleNames,
    pub limit: RelayRuleLimit,
    pub observer: Option<&'a str>,
}

impl<'a> DesiredRule<'a> {
    pub fn new(rule: &'a Rule, fallback_node: u64, observer: Option<&'a str>) -> Self {
        Self {
            rule,
            names: RuleNames::for_rule(rule, fallback_node),
            limit: parse_limits(&rule.limit),
            observer,
        }
    }

    /// Speed limiter name, if the rule has a speed limit.
    pub fn speed_limiter(&self) -> Option<&str> {
        (!self.limit.speed_limits.is_empty()).then_some(self.names.speed_limiter.as_str())
    }

    /// Connection limiter name, if the rule has a connection limit.
    pub fn conn_limiter(&self) -> Option<&str> {
        (!self.limit.conn_limits.is_empty()).then_some(self.names.conn_limiter.as_str())
    }

    pub fn listen_addr(&self) -> String {
        format!(":{}", self.rule.listen_port)
    }

    /// Limiter objects to ensure before the service is written.
    pub fn limiters(&self) -> Vec<Resource> {
        let mut resources = Vec::new();
        if let Some(name) = self.speed_limiter() {
            resources.push(Resource::Limiter(LimiterConfig {
                name: name.to_string(),
                limits: self.limit.speed_limits.clone(),
            }));
        }
        if let Some(name) = self.conn_limiter() {
            resources.push(Resource::CLimiter(LimiterConfig {
                name: name.to_string(),
                limits: self.limit.conn_limits.clone(),
            }));
        }
        resources
    }

    /// Relay listener accepting tunnels from ingress nodes.
    pub fn egress_service(&self) -> ServiceConfig {
        ServiceConfig {
            name: self.names.service.clone(),
            addr: self.listen_addr(),
            handler: HandlerConfig {
                kind: "relay".to_string(),
                chain: None,
                auth: self.rule.tunnel.as_ref().map(tunnel_auth),
            },
            listener: ListenerConfig {
                kind: egress_listener_type(&self.rule.transport_type).to_string(),
            },
            forwarder: None,
            limiter: None,
            climiter: None,
            observer: self.observer.map(str::to_string),
        }
    }

    /// Single-hop relay chain towards the tunnel's egress.
    pub fn tunnel_chain(&self, tunnel: &Tunnel) -> ChainConfig {
        let chain = &self.names.chain;
        ChainConfig {
            name: chain.clone(),
            hops: vec![Hop {
                name: format!("{}-hop", chain),
                nodes: vec![ChainNode {
                    name: format!("{}-relay-node", chain),
                    addr: tunnel.addr.clone(),
                    connector: Plugin {
                        kind: "relay".to_string(),
                        auth: Some(tunnel_auth(tunnel)),
                    },
                    dialer: Plugin {
                        kind: "ws".to_string(),
                        auth: None,
                    },
                }],
            }],
        }
    }

    /// TCP forwarding service, bound to `chain` when given.
    pub fn forward_service(&self, chain: Option<&str>) -> ServiceConfig {
        let service = &self.names.service;
        let nodes = self
            .rule
            .target_list()
            .into_iter()
            .enumerate()
            .map(|(index, addr)| ForwardNode {
                name: format!("{}-target-{}", service, index),
                addr,
            })
            .collect();

        ServiceConfig {
            name: service.clone(),
            addr: self.listen_addr(),
            handler: HandlerConfig {
                kind: "tcp".to_string(),
                chain: chain.map(str::to_string),
                auth: None,
            },
            listener: ListenerConfig {
                kind: "tcp".to_string(),
            },
            forwarder: Some(ForwarderConfig { nodes }),
            limiter: self.speed_limiter().map(str::to_string),
            climiter: self.conn_limiter().map(str::to_string),
            observer: self.observer.map(str::to_string),
        }
    }
}

fn tunnel_auth(tunnel: &Tunnel) -> Auth {
    Auth {
        username: tunnel.username.clone(),
        password: tunnel.password.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::types::RuleType;
    use serde_json::json;

    fn tunnel_rule(limit: &str) -> Rule {
        Rule {
            id: 2,
            rule_type: RuleType::Tunnel,
            listen_port: 9000,
            targets: "10.0.0.1:80\n10.0.0.2:80".into(),
            tunnel: Some(Tunnel { addr: "relay:9999".into(), username: "u".into(), password: "p".into() }),
            ingress_node: Some(1),
            egress_node: None,
            limit: limit.into(),
            transport_type: "WebSocket".into(),
        }
    }

    #[test]
    fn test_transport_mapping() {
        assert_eq!(listener_type_for("WebSocket"), "ws");
        assert_eq!(listener_type_for("gRPC"), "unknown");
        assert_eq!(listener_type_for(""), "unknown");
        assert_eq!(egress_listener_type("gRPC"), "ws");
    }

    #[test]
    fn test_limiters_only_when_configured() {
        let rule = tunnel_rule(r#"{"conn": 5}"#);
        let desired = DesiredRule::new(&rule, 1, None);
        assert_eq!(desired.speed_limiter(), None);
        assert_eq!(desired.conn_limiter(), Some("rule-2-tunnel-node-1-conn-limiter"));

        let limiters = desired.limiters();
        assert_eq!(limiters.len(), 1);
        assert_eq!(
            limiters[0].to_json(),
            json!({"name": "rule-2-tunnel-node-1-conn-limiter", "limits": ["$ 5"]})
        );
    }

    #[test]
    fn test_tunnel_objects() {
        let rule = tunnel_rule(r#"{"speed": 800000}"#);
        let desired = DesiredRule::new(&rule, 1, Some("node-observer"));
        let tunnel = rule.tunnel.as_ref().unwrap();

        let chain = desired.tunnel_chain(tunnel);
        assert_eq!(
            Resource::Chain(chain.clone()).to_json(),
            json!({
                "name": "rule-2-tunnel-node-1-chain",
                "hops": [{
                    "name": "rule-2-tunnel-node-1-chain-hop",
                    "nodes": [{
                        "name": "rule-2-tunnel-node-1-chain-relay-node",
                        "addr": "relay:9999",
                        "connector": {"type": "relay", "auth": {"username": "u", "password": "p"}},
                        "dialer": {"type": "ws"}
                    }]
                }]
            })
        );

        let service = desired.forward_service(Some(&chain.name));
        assert_eq!(
            Resource::Service(service).to_json(),
            json!({
                "name": "rule-2-tunnel-node-1",
                "addr": ":9000",
                "handler": {"type": "tcp", "chain": "rule-2-tunnel-node-1-chain"},
                "listener": {"type": "tcp"},
                "forwarder": {"nodes": [
                    {"name": "rule-2-tunnel-node-1-target-0", "addr": "10.0.0.1:80"},
                    {"name": "rule-2-tunnel-node-1-target-1", "addr": "10.0.0.2:80"}
                ]},
                "limiter": "rule-2-tunnel-node-1-speed-limiter",
                "observer": "node-observer"
            })
        );
    }

    #[test]
    fn test_egress_service() {
        let mut rule = tunnel_rule("{}");
        rule.rule_type = RuleType::Egress;
        rule.egress_node = Some(4);
        let desired = DesiredRule::new(&rule, 1, None);

        let service = desired.egress_service();
        assert_eq!(service.name, "rule-2-egress-node-4");
        assert_eq!(service.handler.kind, "relay");
        assert_eq!(service.handler.auth.as_ref().unwrap().username, "u");
        assert_eq!(service.listener.kind, "ws");
        assert!(service.forwarder.is_none());
    }
}
