//! Reconciliation pass.
//!
//! # States
//! ```text
//! FETCH_ACTUAL → FETCH_DESIRED → ROUTE_AND_SYNC ┐
//!                                  CLEANUP ─────┴→ DONE
//!       └── either fetch fails ──→ ABORTED
//! ```
//!
//! Rule syncs and cleanup deletes run concurrently and are all awaited before
//! the pass returns. A failing sub-task never cancels its siblings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::{join, join_all};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::gost::client::{upsert, ProxyControl};
use crate::gost::types::{
    ChainConfig, ConfigSnapshot, GostError, LimiterConfig, Resource, ServiceConfig,
};
use crate::observability::metrics;
use crate::panel::client::Management;
use crate::panel::types::{PanelError, Rule, RuleStatus, RuleType};
use crate::sync::cleanup::{remove_orphans, CleanupReport};
use crate::sync::desired::DesiredRule;
use crate::sync::diff::{check_egress, check_limiter, check_raw, check_tunnel, Verdict};
use crate::sync::naming::RuleNames;

/// Errors that abort a pass before anything is written.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching GOST config failed: {0}")]
    FetchActual(#[source] GostError),

    #[error("fetching relay rules failed: {0}")]
    FetchDesired(#[source] PanelError),
}

/// Result of syncing one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// GOST already matches the rule; nothing written.
    Converged,
    /// Objects written. `reported` is false if the status callback failed.
    Applied { reported: bool },
    /// A write failed.
    Failed(String),
    /// Rule not handled by this agent.
    Skipped(String),
}

impl RuleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOutcome::Converged => "converged",
            RuleOutcome::Applied { .. } => "applied",
            RuleOutcome::Failed(_) => "failed",
            RuleOutcome::Skipped(_) => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub rule_id: u64,
    pub rule_type: RuleType,
    pub service: String,
    pub outcome: RuleOutcome,
}

/// Everything that happened during one pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub rules: Vec<RuleReport>,
    pub cleanup: CleanupReport,
}

impl PassReport {
    pub fn applied(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Applied { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Failed(_)))
            .count()
    }
}

/// Snapshot and keep-set for a single pass. Dropped when the pass ends.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPass {
    pub service_map: HashMap<String, ServiceConfig>,
    pub chain_map: HashMap<String, ChainConfig>,
    pub limiter_map: HashMap<String, LimiterConfig>,
    pub climiter_map: HashMap<String, LimiterConfig>,
    pub new_service_names: HashSet<String>,
}

impl ReconciliationPass {
    pub fn new(snapshot: ConfigSnapshot, rules: &[Rule], fallback_node: u64) -> Self {
        Self {
            service_map: snapshot
                .services
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            chain_map: snapshot
                .chains
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
            limiter_map: snapshot
                .limiters
                .into_iter()
                .map(|l| (l.name.clone(), l))
                .collect(),
            climiter_map: snapshot
                .climiters
                .into_iter()
                .map(|l| (l.name.clone(), l))
                .collect(),
            new_service_names: rules
                .iter()
                .map(|r| RuleNames::for_rule(r, fallback_node).service)
                .collect(),
        }
    }
}

/// Settings the reconciler needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// This node's id, used when a rule omits its node.
    pub node_id: u64,
    /// Observer attached to written services.
    pub observer: Option<String>,
}

/// Drives GOST towards the rules assigned to this node.
pub struct Reconciler {
    gost: Arc<dyn ProxyControl>,
    panel: Arc<dyn Management>,
    options: ReconcilerOptions,
    pass_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        gost: Arc<dyn ProxyControl>,
        panel: Arc<dyn Management>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            gost,
            panel,
            options,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one full pass. Concurrent callers are serialized.
    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        let _guard = self.pass_lock.lock().await;
        let pass_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_pass", %pass_id);

        let result = self.run_pass_inner(pass_id).instrument(span).await;
        match &result {
            Ok(report) => {
                metrics::record_pass("ok");
                tracing::info!(
                    %pass_id,
                    rules = report.rules.len(),
                    applied = report.applied(),
                    failed = report.failed(),
                    "Sync pass complete"
                );
            }
            Err(e) => {
                metrics::record_pass("aborted");
                tracing::error!(%pass_id, error = %e, "Sync pass aborted");
            }
        }
        result
    }

    async fn run_pass_inner(&self, pass_id: Uuid) -> Result<PassReport, SyncError> {
        let snapshot = self.gost.fetch_config().await.map_err(SyncError::FetchActual)?;
        let rules = self
            .panel
            .fetch_relay_rules()
            .await
            .map_err(SyncError::FetchDesired)?;

        let pass = ReconciliationPass::new(snapshot, &rules, self.options.node_id);
        tracing::debug!(
            services = pass.service_map.len(),
            chains = pass.chain_map.len(),
            rules = rules.len(),
            "Fetched actual and desired state"
        );

        let syncs = join_all(rules.iter().map(|rule| self.sync_rule(&pass, rule)));
        let cleanup = remove_orphans(self.gost.as_ref(), &pass);
        let (reports, cleanup) = join(syncs, cleanup).await;

        metrics::record_managed_services(pass.new_service_names.len());
        Ok(PassReport {
            pass_id,
            rules: reports,
            cleanup,
        })
    }

    async fn sync_rule(&self, pass: &ReconciliationPass, rule: &Rule) -> RuleReport {
        let desired = DesiredRule::new(rule, self.options.node_id, self.options.observer.as_deref());
        let outcome = match &rule.rule_type {
            RuleType::Egress => self.sync_egress(pass, &desired).await,
            RuleType::Tunnel => self.sync_tunnel(pass, &desired).await,
            RuleType::Raw => self.sync_raw(pass, &desired).await,
            RuleType::Other(kind) => {
                tracing::warn!(rule_id = rule.id, rule_type = %kind, "Unsupported rule type, skipping");
                RuleOutcome::Skipped(format!("unsupported rule type '{}'", kind))
            }
        };

        metrics::record_rule_sync(rule.rule_type.as_str(), outcome.as_str());
        RuleReport {
            rule_id: rule.id,
            rule_type: rule.rule_type.clone(),
            service: desired.names.service,
            outcome,
        }
    }

    async fn sync_egress(&self, pass: &ReconciliationPass, desired: &DesiredRule<'_>) -> RuleOutcome {
        let service = &desired.names.service;
        let verdict = check_egress(desired, pass.service_map.get(service));
        if let Some(outcome) = converged(service, verdict) {
            return outcome;
        }

        let resource = Resource::Service(desired.egress_service());
        if let Err(e) = upsert(self.gost.as_ref(), &resource).await {
            return write_failed(service, "egress service", e);
        }
        self.activate(desired).await
    }

    async fn sync_tunnel(&self, pass: &ReconciliationPass, desired: &DesiredRule<'_>) -> RuleOutcome {
        let service = &desired.names.service;
        let Some(tunnel) = desired.rule.tunnel.as_ref() else {
            tracing::error!(service = %service, "Tunnel rule has no tunnel settings");
            return RuleOutcome::Failed("tunnel rule has no tunnel settings".to_string());
        };

        self.ensure_limiters(pass, desired).await;

        let verdict = check_tunnel(desired, pass.service_map.get(service), &pass.chain_map);
        if let Some(outcome) = converged(service, verdict) {
            return outcome;
        }

        let chain = desired.tunnel_chain(tunnel);
        let chain_name = chain.name.clone();
        if let Err(e) = upsert(self.gost.as_ref(), &Resource::Chain(chain)).await {
            return write_failed(service, "chain", e);
        }

        let resource = Resource::Service(desired.forward_service(Some(&chain_name)));
        if let Err(e) = upsert(self.gost.as_ref(), &resource).await {
            return write_failed(service, "tunnel service", e);
        }
        self.activate(desired).await
    }

    async fn sync_raw(&self, pass: &ReconciliationPass, desired: &DesiredRule<'_>) -> RuleOutcome {
        let service = &desired.names.service;
        self.ensure_limiters(pass, desired).await;

        let verdict = check_raw(desired, pass.service_map.get(service));
        if let Some(outcome) = converged(service, verdict) {
            return outcome;
        }

        let resource = Resource::Service(desired.forward_service(None));
        if let Err(e) = upsert(self.gost.as_ref(), &resource).await {
            return write_failed(service, "raw service", e);
        }
        self.activate(desired).await
    }

    /// Create or update the rule's limiters unless GOST already has them as
    /// wanted. Failures are logged only; the service write still goes ahead.
    async fn ensure_limiters(&self, pass: &ReconciliationPass, desired: &DesiredRule<'_>) {
        let limiters: Vec<Resource> = desired
            .limiters()
            .into_iter()
            .filter(|l| !check_limiter(l, &pass.limiter_map, &pass.climiter_map))
            .collect();
        if limiters.is_empty() {
            return;
        }

        let results = join_all(limiters.iter().map(|l| upsert(self.gost.as_ref(), l))).await;
        for (limiter, result) in limiters.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(
                    kind = limiter.kind().as_str(),
                    name = limiter.name(),
                    error = %e,
                    "Failed to upsert limiter"
                );
            }
        }
    }

    /// Tell the panel the rule is live.
    async fn activate(&self, desired: &DesiredRule<'_>) -> RuleOutcome {
        let rule = desired.rule;
        tracing::info!(service = %desired.names.service, "Rule applied");
        let reported = match self
            .panel
            .update_relay_rule_status(rule.id, rule.rule_type.as_str(), RuleStatus::Active)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(rule_id = rule.id, error = %e, "Failed to report rule status");
                false
            }
        };
        RuleOutcome::Applied { reported }
    }
}

fn converged(service: &str, verdict: Verdict) -> Option<RuleOutcome> {
    match verdict {
        Verdict::Converged => {
            tracing::debug!(service, "Service already up to date");
            Some(RuleOutcome::Converged)
        }
        Verdict::Write(reason) => {
            tracing::info!(service, %reason, "Creating or updating service");
            None
        }
    }
}

fn write_failed(service: &str, what: &str, e: GostError) -> RuleOutcome {
    tracing::error!(service, what, error = %e, "GOST write failed");
    RuleOutcome::Failed(format!("{} write failed: {}", what, e))
}
