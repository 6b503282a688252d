//! Periodic driver for sync passes and traffic reports.
//!
//! # Responsibilities
//! - Run a sync pass every `sync_interval_secs`
//! - Report traffic every `traffic_interval_secs`, using the interval as the window
//! - Stop at the next tick boundary once shutdown fires
//!
//! Errors never stop the loop; the next tick starts from a fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join;
use tokio::sync::broadcast;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::config::SchedConfig;
use crate::sync::{PassReport, Reconciler, SyncError};
use crate::traffic::TrafficReporter;

pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    reporter: Arc<TrafficReporter>,
    sync_every: Duration,
    traffic_every: Duration,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, reporter: Arc<TrafficReporter>, config: &SchedConfig) -> Self {
        Self {
            reconciler,
            reporter,
            sync_every: Duration::from_secs(config.sync_interval_secs),
            traffic_every: Duration::from_secs(config.traffic_interval_secs),
        }
    }

    /// Run until `shutdown` fires. Both tickers fire immediately on start.
    ///
    /// Sync passes and traffic reports run as two loops polled side by side,
    /// so a slow pass never delays a traffic window.
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            sync_secs = self.sync_every.as_secs(),
            traffic_secs = self.traffic_every.as_secs(),
            "Scheduler started"
        );

        join(self.sync_loop(shutdown.resubscribe()), self.traffic_loop(shutdown)).await;
        tracing::info!("Scheduler stopped");
    }

    async fn sync_loop(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut tick = ticker(self.sync_every);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tick.tick() => {
                    let _ = self.sync_once().await;
                }
            }
        }
    }

    async fn traffic_loop(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut tick = ticker(self.traffic_every);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tick.tick() => self.report_once().await,
            }
        }
    }

    /// One sync pass. The reconciler logs the outcome.
    pub async fn sync_once(&self) -> Result<PassReport, SyncError> {
        self.reconciler.run_pass().await
    }

    /// One traffic report over the configured window.
    pub async fn report_once(&self) {
        if let Err(e) = self.reporter.report(self.traffic_every.as_secs()).await {
            tracing::error!(error = %e, "Traffic report failed");
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut tick = time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick
}
