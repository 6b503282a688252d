//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     AgentConfig → HTTP client → GOST / panel / Prometheus clients → Agent
//!
//! Scheduling (scheduler.rs):
//!     sync interval    → Reconciler::run_pass
//!     traffic interval → TrafficReporter::report
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → scheduler loop exits
//! ```
//!
//! # Design Decisions
//! - Startup fails fast on bad endpoints; remote outages are only logged per tick
//! - Work in progress finishes before the loop observes shutdown

pub mod scheduler;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use scheduler::Scheduler;
pub use shutdown::Shutdown;
pub use startup::{build_agent, Agent, StartupError};
