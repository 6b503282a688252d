//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the node agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay sync agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Logging settings.
    pub log: LogConfig,

    /// GOST control API settings.
    pub gost: GostConfig,

    /// Management panel settings.
    pub panel: PanelConfig,

    /// Prometheus query API settings.
    pub prometheus: PrometheusConfig,

    /// Sync and traffic report intervals.
    pub sched: SchedConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Internal metrics exposition.
    pub observability: ObservabilityConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// GOST control API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GostConfig {
    /// Base URL of the GOST web API (e.g., "http://127.0.0.1:18080").
    pub endpoint: String,

    /// Observer attached to every managed service, if any.
    pub observer: Option<String>,
}

impl Default for GostConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:18080".to_string(),
            observer: None,
        }
    }
}

/// Management panel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL of the panel.
    pub endpoint: String,

    /// Identifier of this node in the panel.
    pub node_id: u64,

    /// Node token sent with every request.
    pub token: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            node_id: 0,
            token: String::new(),
        }
    }
}

/// Prometheus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus server scraping GOST.
    pub endpoint: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9090".to_string(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedConfig {
    /// Interval between rule sync passes in seconds.
    pub sync_interval_secs: u64,

    /// Interval between traffic reports in seconds.
    /// Also used as the Prometheus `increase` window.
    pub traffic_interval_secs: u64,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 20,
            traffic_interval_secs: 30,
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter for the agent's own metrics.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
