//! Removal of services and chains no rule asks for anymore.

use futures_util::future::join_all;

use crate::gost::client::ProxyControl;
use crate::gost::types::ResourceKind;
use crate::observability::metrics;
use crate::sync::naming::chain_name;
use crate::sync::reconciler::ReconciliationPass;

/// What cleanup did during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted_services: Vec<String>,
    pub deleted_chains: Vec<String>,
    /// `(kind, name, error)` for every delete that failed.
    pub failed: Vec<(ResourceKind, String, String)>,
}

/// Services and chains present in GOST but not wanted by this pass, sorted by name.
pub fn orphans(pass: &ReconciliationPass) -> (Vec<String>, Vec<String>) {
    let mut services: Vec<String> = pass
        .service_map
        .keys()
        .filter(|name| !pass.new_service_names.contains(*name))
        .cloned()
        .collect();
    services.sort();

    let wanted_chains: std::collections::HashSet<String> =
        pass.new_service_names.iter().map(|s| chain_name(s)).collect();
    let mut chains: Vec<String> = pass
        .chain_map
        .keys()
        .filter(|name| !wanted_chains.contains(*name))
        .cloned()
        .collect();
    chains.sort();

    (services, chains)
}

/// Delete every orphan concurrently. Failures are logged and reported, never retried.
pub async fn remove_orphans(api: &dyn ProxyControl, pass: &ReconciliationPass) -> CleanupReport {
    let (services, chains) = orphans(pass);

    let targets = services
        .into_iter()
        .map(|name| (ResourceKind::Service, name))
        .chain(chains.into_iter().map(|name| (ResourceKind::Chain, name)));

    let results = join_all(targets.map(|(kind, name)| async move {
        let result = api.delete(kind, &name).await;
        (kind, name, result)
    }))
    .await;

    let mut report = CleanupReport::default();
    for (kind, name, result) in results {
        match result {
            Ok(()) => {
                metrics::record_delete(kind.as_str(), "ok");
                match kind {
                    ResourceKind::Service => report.deleted_services.push(name),
                    _ => report.deleted_chains.push(name),
                }
            }
            Err(e) => {
                tracing::error!(kind = kind.as_str(), name = %name, error = %e, "Failed to delete orphan");
                metrics::record_delete(kind.as_str(), "error");
                report.failed.push((kind, name, e.to_string()));
            }
        }
    }

    tracing::info!(
        services = report.deleted_services.len(),
        chains = report.deleted_chains.len(),
        failed = report.failed.len(),
        "Orphan cleanup finished"
    );
    report
}
