//! Convergence checks between a desired rule and the live GOST objects.
//!
//! A check returns [`Verdict::Converged`] only when every compared field
//! matches; the first mismatch found is reported as the reason to write.

use std::collections::HashMap;
use std::fmt;

use crate::gost::types::{ChainConfig, LimiterConfig, Resource, ServiceConfig};
use crate::sync::desired::{listener_type_for, DesiredRule};

/// First field found out of line with the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    Missing,
    Port,
    Targets,
    Relay,
    Transport,
    SpeedLimiter,
    ConnLimiter,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Divergence::Missing => "service missing",
            Divergence::Port => "listen port changed",
            Divergence::Targets => "targets changed",
            Divergence::Relay => "relay address changed",
            Divergence::Transport => "transport changed",
            Divergence::SpeedLimiter => "speed limiter changed",
            Divergence::ConnLimiter => "conn limiter changed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Converged,
    Write(Divergence),
}

impl Verdict {
    pub fn needs_write(&self) -> bool {
        matches!(self, Verdict::Write(_))
    }
}

impl From<Result<(), Divergence>> for Verdict {
    fn from(result: Result<(), Divergence>) -> Self {
        match result {
            Ok(()) => Verdict::Converged,
            Err(d) => Verdict::Write(d),
        }
    }
}

fn existing<'s>(actual: Option<&'s ServiceConfig>) -> Result<&'s ServiceConfig, Divergence> {
    actual.ok_or(Divergence::Missing)
}

fn check_port(desired: &DesiredRule<'_>, actual: &ServiceConfig) -> Result<(), Divergence> {
    if actual.port() == desired.rule.listen_port.to_string() {
        Ok(())
    } else {
        Err(Divergence::Port)
    }
}

fn check_targets(desired: &DesiredRule<'_>, actual: &ServiceConfig) -> Result<(), Divergence> {
    let wanted = desired.rule.target_list();
    if actual.target_addrs() == wanted {
        Ok(())
    } else {
        Err(Divergence::Targets)
    }
}

fn check_limiters(desired: &DesiredRule<'_>, actual: &ServiceConfig) -> Result<(), Divergence> {
    if actual.limiter.as_deref() != desired.speed_limiter() {
        return Err(Divergence::SpeedLimiter);
    }
    if actual.climiter.as_deref() != desired.conn_limiter() {
        return Err(Divergence::ConnLimiter);
    }
    Ok(())
}

/// Egress: port and listener transport.
pub fn check_egress(desired: &DesiredRule<'_>, actual: Option<&ServiceConfig>) -> Verdict {
    let result = existing(actual).and_then(|svc| {
        check_port(desired, svc)?;
        if svc.listener.kind != listener_type_for(&desired.rule.transport_type) {
            return Err(Divergence::Transport);
        }
        Ok(())
    });
    result.into()
}

/// Tunnel: port, targets, relay address behind the service's chain, limiters.
pub fn check_tunnel(
    desired: &DesiredRule<'_>,
    actual: Option<&ServiceConfig>,
    chains: &HashMap<String, ChainConfig>,
) -> Verdict {
    let relay = desired.rule.tunnel.as_ref().map(|t| t.addr.as_str());
    let result = existing(actual).and_then(|svc| {
        check_port(desired, svc)?;
        check_targets(desired, svc)?;

        let live_relay = svc
            .handler
            .chain
            .as_ref()
            .and_then(|name| chains.get(name))
            .and_then(ChainConfig::single_relay_addr);
        if relay.is_none() || live_relay != relay {
            return Err(Divergence::Relay);
        }

        check_limiters(desired, svc)
    });
    result.into()
}

/// Raw: port, targets, limiters.
pub fn check_raw(desired: &DesiredRule<'_>, actual: Option<&ServiceConfig>) -> Verdict {
    let result = existing(actual).and_then(|svc| {
        check_port(desired, svc)?;
        check_targets(desired, svc)?;
        check_limiters(desired, svc)
    });
    result.into()
}

/// Whether a limiter object already exists in GOST with the same directives.
pub fn check_limiter(
    wanted: &Resource,
    limiters: &HashMap<String, LimiterConfig>,
    climiters: &HashMap<String, LimiterConfig>,
) -> bool {
    match wanted {
        Resource::Limiter(l) => limiters.get(&l.name) == Some(l),
        Resource::CLimiter(l) => climiters.get(&l.name) == Some(l),
        _ => false,
    }
}
