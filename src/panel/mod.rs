//! Management panel subsystem.
//!
//! # Data Flow
//! ```text
//! GET  /api/relay-rule-sync/?node_id&token  → Vec<Rule>      (desired state)
//! PUT  /api/relay-rule-sync/                ← rule status    (after a write)
//! POST /api/relay-rule-traffic/             ← TrafficData    (traffic reporter)
//! ```
//!
//! # Design Decisions
//! - Rules are validated one by one at this boundary; a bad entry never fails the list
//! - Unknown rule types survive decoding as `RuleType::Other` so the reconciler can skip them

pub mod client;
pub mod types;

pub use client::{Management, PanelApi};
pub use types::{PanelError, PanelResult, Rule, RuleStatus, RuleType, TrafficData, Tunnel};
