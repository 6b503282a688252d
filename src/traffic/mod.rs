//! Traffic reporting subsystem.
//!
//! # Data Flow
//! ```text
//! Prometheus (GOST transfer counters)
//!     → source.rs   (instant query, input and output in parallel)
//!     → reporter.rs (merge per service, service name → rule id/type)
//!     → panel::Management::report_traffic
//! ```
//!
//! # Design Decisions
//! - A failed direction counts as no traffic rather than skipping the report
//! - Services that are not managed by this agent are ignored

pub mod reporter;
pub mod source;

pub use reporter::{calc_traffic_by_service, Direction, TrafficReporter};
pub use source::{MetricsSource, PromError, PrometheusApi, Sample};
