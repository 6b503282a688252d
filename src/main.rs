//! GOST relay rule sync agent (daemon).
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐  rules / status / traffic   ┌──────────────────────────┐
//!   │    panel     │◀───────────────────────────▶│        relay-sync        │
//!   └──────────────┘                             │                          │
//!                                                │  scheduler               │
//!   ┌──────────────┐  GET /config, POST/PUT/DEL  │   ├─ sync::Reconciler    │
//!   │  GOST (API)  │◀───────────────────────────▶│   └─ traffic::Reporter   │
//!   └──────────────┘                             │                          │
//!   ┌──────────────┐  /api/v1/query              │  config · observability  │
//!   │  Prometheus  │◀────────────────────────────│  lifecycle               │
//!   └──────────────┘                             └──────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use relay_sync::config::load_config;
use relay_sync::lifecycle::signals::spawn_signal_handler;
use relay_sync::lifecycle::{build_agent, Scheduler, Shutdown};
use relay_sync::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "relay-sync")]
#[command(about = "Reconcile GOST relay rules with the management panel", long_about = None)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "relay-sync.toml")]
    config: PathBuf,

    /// Run one sync pass and one traffic report, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.log.level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "relay-sync starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let agent = match build_agent(&config) {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };
    let scheduler = Scheduler::new(agent.reconciler, agent.reporter, &config.sched);

    if cli.once {
        let result = scheduler.sync_once().await;
        scheduler.report_once().await;
        return match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let shutdown = Arc::new(Shutdown::new());
    let stop = shutdown.subscribe();
    spawn_signal_handler(shutdown);
    scheduler.run(stop).await;

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
