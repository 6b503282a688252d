//! Rule reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigSnapshot (gost) + Vec<Rule> (panel)
//!     → reconciler.rs (one ReconciliationPass per tick)
//!         → naming.rs   (service / chain / limiter names)
//!         → limits.rs   (limit string → limiter directives)
//!         → desired.rs  (GOST objects the rule should produce)
//!         → diff.rs     (converged or write, and why)
//!         → gost::upsert + panel status callback
//!     → cleanup.rs (delete services and chains no rule wants)
//!     → PassReport
//! ```
//!
//! # Design Decisions
//! - Names are a pure function of rule identity, so objects are never renamed
//! - Every rule sync and every cleanup delete run concurrently and are all awaited
//! - Passes on one node are serialized by the reconciler

pub mod cleanup;
pub mod desired;
pub mod diff;
pub mod limits;
pub mod naming;
pub mod reconciler;

pub use cleanup::CleanupReport;
pub use limits::{parse_limits, RelayRuleLimit};
pub use naming::{parse_rule_info, service_name, NameError, RuleInfo};
pub use reconciler::{
    PassReport, Reconciler, ReconcilerOptions, RuleOutcome, RuleReport, SyncError,
};
