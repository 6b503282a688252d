//! GOST relay rule sync agent.
//!
//! Keeps a local GOST proxy's services, chains and limiters in line with the
//! relay rules a management panel assigns to this node, and reports per-rule
//! traffic back to the panel.

pub mod config;
pub mod gost;
pub mod lifecycle;
pub mod observability;
pub mod panel;
pub mod sync;
pub mod traffic;

pub use config::AgentConfig;
pub use lifecycle::Shutdown;
pub use sync::{PassReport, Reconciler};
