//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! reconciler / gost client / traffic reporter
//!     → logging.rs (tracing events, one span per sync pass)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Prometheus scrape of the agent itself (optional exporter)
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until an exporter is installed
//! - `RUST_LOG` overrides the configured log level

pub mod logging;
pub mod metrics;
