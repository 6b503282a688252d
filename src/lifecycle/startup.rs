//! Startup orchestration.
//!
//! Turns a validated [`AgentConfig`] into the wired reconciler and traffic
//! reporter. Nothing is contacted here; the first request goes out on the
//! first scheduler tick.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::config::AgentConfig;
use crate::gost::GostApi;
use crate::panel::PanelApi;
use crate::sync::{Reconciler, ReconcilerOptions};
use crate::traffic::{PrometheusApi, TrafficReporter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {field} URL '{value}': {source}")]
    Endpoint {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything the scheduler drives.
pub struct Agent {
    pub reconciler: Arc<Reconciler>,
    pub reporter: Arc<TrafficReporter>,
}

/// Shared HTTP client with the configured per-request timeout.
pub fn http_client(timeouts: &TimeoutConfig) -> Result<Client, StartupError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .user_agent(concat!("relay-sync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

pub fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, StartupError> {
    Url::parse(value).map_err(|source| StartupError::Endpoint {
        field,
        value: value.to_string(),
        source,
    })
}

pub fn gost_api(config: &AgentConfig, client: Client) -> Result<GostApi, StartupError> {
    Ok(GostApi::new(
        client,
        parse_endpoint("gost.endpoint", &config.gost.endpoint)?,
    ))
}

/// Wire the API clients, reconciler and reporter from `config`.
pub fn build_agent(config: &AgentConfig) -> Result<Agent, StartupError> {
    let client = http_client(&config.timeouts)?;

    let gost = Arc::new(gost_api(config, client.clone())?);
    let panel = Arc::new(PanelApi::new(
        client.clone(),
        parse_endpoint("panel.endpoint", &config.panel.endpoint)?,
        config.panel.node_id,
        config.panel.token.clone(),
    ));
    let prometheus = Arc::new(PrometheusApi::new(
        client,
        parse_endpoint("prometheus.endpoint", &config.prometheus.endpoint)?,
    ));

    let options = ReconcilerOptions {
        node_id: config.panel.node_id,
        observer: config.gost.observer.clone(),
    };
    tracing::info!(
        gost = %config.gost.endpoint,
        panel = %config.panel.endpoint,
        node_id = config.panel.node_id,
        "Agent initialized"
    );

    Ok(Agent {
        reconciler: Arc::new(Reconciler::new(gost, panel.clone(), options)),
        reporter: Arc::new(TrafficReporter::new(prometheus, panel)),
    })
}
