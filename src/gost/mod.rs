//! GOST control API subsystem.
//!
//! # Data Flow
//! ```text
//! GET /config
//!     → client.rs (HTTP, reply classification)
//!     → types.rs (ConfigSnapshot of services/chains/limiters)
//!     → reconciler builds service_map / chain_map
//!
//! Desired Resource
//!     → client::upsert (POST, on "object duplicated" one PUT)
//!     → GOST
//! ```
//!
//! # Design Decisions
//! - GOST only reports a free-text `msg`; it is mapped to [`GostError`] at the call site
//! - The same typed structs are used to read the snapshot and to write objects
//! - [`ProxyControl`] is the seam the reconciler depends on

pub mod client;
pub mod types;

pub use client::{upsert, GostApi, ProxyControl};
pub use types::{
    ChainConfig, ConfigSnapshot, GostError, GostResult, LimiterConfig, Resource, ResourceKind,
    ServiceConfig,
};
