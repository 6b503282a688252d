//! Resource naming.
//!
//! Every GOST object this agent owns is named from the rule identity:
//!
//! ```text
//! service  rule-{id}-{type}-node-{node}
//! chain    {service}-chain
//! limiter  {service}-{speed|conn}-limiter
//! ```
//!
//! Only service names are parsed back (traffic metrics are labelled by service).

use std::fmt;

use thiserror::Error;

use crate::panel::types::Rule;

/// Service name could not be turned back into a rule identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("malformed service name '{0}'")]
    Malformed(String),
}

/// Limiter flavours attached to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterKind {
    Speed,
    Conn,
}

impl LimiterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterKind::Speed => "speed",
            LimiterKind::Conn => "conn",
        }
    }
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn service_name(rule_id: u64, rule_type: &str, node_id: u64) -> String {
    format!("rule-{}-{}-node-{}", rule_id, rule_type.to_lowercase(), node_id)
}

pub fn chain_name(service: &str) -> String {
    format!("{}-chain", service)
}

pub fn limiter_name(service: &str, kind: LimiterKind) -> String {
    format!("{}-{}-limiter", service, kind)
}

/// Rule identity recovered from a service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub rule_id: u64,
    /// Lowercase rule type.
    pub rule_type: String,
    pub node_id: u64,
}

/// Inverse of [`service_name`].
pub fn parse_rule_info(service: &str) -> Result<RuleInfo, NameError> {
    let malformed = || NameError::Malformed(service.to_string());

    let parts: Vec<&str> = service.split('-').collect();
    if parts.len() < 5 {
        return Err(malformed());
    }
    let rule_id = parts[1].parse().map_err(|_| malformed())?;
    let node_id = parts[4].parse().map_err(|_| malformed())?;

    Ok(RuleInfo {
        rule_id,
        rule_type: parts[2].to_string(),
        node_id,
    })
}

/// All names derived for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNames {
    pub service: String,
    pub chain: String,
    pub speed_limiter: String,
    pub conn_limiter: String,
}

impl RuleNames {
    pub fn new(service: String) -> Self {
        Self {
            chain: chain_name(&service),
            speed_limiter: limiter_name(&service, LimiterKind::Speed),
            conn_limiter: limiter_name(&service, LimiterKind::Conn),
            service,
        }
    }

    /// Names for `rule`, using `fallback_node` when the rule carries no node id.
    pub fn for_rule(rule: &Rule, fallback_node: u64) -> Self {
        Self::new(service_name(
            rule.id,
            rule.rule_type.as_str(),
            rule.node_id(fallback_node),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_service_name() {
        assert_eq!(service_name(2, "Tunnel", 1), "rule-2-tunnel-node-1");
        assert_eq!(service_name(10, "EGRESS", 3), "rule-10-egress-node-3");
    }

    #[test]
    fn test_chain_and_limiter_names() {
        let svc = "rule-2-tunnel-node-1";
        assert_eq!(chain_name(svc), "rule-2-tunnel-node-1-chain");
        assert_eq!(limiter_name(svc, LimiterKind::Speed), "rule-2-tunnel-node-1-speed-limiter");
        assert_eq!(limiter_name(svc, LimiterKind::Conn), "rule-2-tunnel-node-1-conn-limiter");
    }

    #[test]
    fn test_parse_rule_info_from_service() {
        let info = parse_rule_info("rule-2-egress-node-1").unwrap();
        assert_eq!(info, RuleInfo { rule_id: 2, rule_type: "egress".into(), node_id: 1 });
    }

    #[test]
    fn test_round_trip() {
        for rule_type in ["Egress", "Tunnel", "Raw"] {
            for (rule_id, node_id) in [(0, 1), (1, 1), (42, 7), (u64::MAX, u64::MAX)] {
                let info = parse_rule_info(&service_name(rule_id, rule_type, node_id)).unwrap();
                assert_eq!(info.rule_id, rule_id);
                assert_eq!(info.rule_type, rule_type.to_lowercase());
                assert_eq!(info.node_id, node_id);
            }
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for name in ["", "rule-2-raw", "rule-x-raw-node-1", "rule-2-raw-node-y", "node-observer"] {
            assert_eq!(parse_rule_info(name), Err(NameError::Malformed(name.to_string())), "{name}");
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for rule_id in 1..=20 {
            for rule_type in ["Egress", "Tunnel", "Raw"] {
                for node_id in 1..=5 {
                    let names = RuleNames::new(service_name(rule_id, rule_type, node_id));
                    assert!(seen.insert(names.service.clone()));
                    assert!(seen.insert(names.chain));
                    assert!(seen.insert(names.speed_limiter));
                    assert!(seen.insert(names.conn_limiter));
                }
            }
        }
    }
}
