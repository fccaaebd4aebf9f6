//! Application service — pruner.
//!
//! Best-effort: nothing here can fail a deployment that already launched.

use crate::application::ports::{ExecutionBackend, ProgressReporter};
use crate::application::services::host::{list_instances, stderr_text};
use crate::domain::config::DeploymentConfig;
use crate::domain::docker;
use crate::domain::instance::select_for_pruning;

/// What the pruner removed and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Container names removed together with their volumes.
    pub removed: Vec<String>,
    /// `(resource, reason)` for every failed removal.
    pub failed: Vec<(String, String)>,
}

impl PruneReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Delete siblings outside the newest `keep_versions`, excluding the
/// instance just launched.
pub async fn prune(
    backend: &impl ExecutionBackend,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
) -> PruneReport {
    let mut report = PruneReport::default();
    let identity = &config.identity;

    let instances = match list_instances(backend, identity).await {
        Ok(instances) => instances,
        Err(e) => {
            reporter.warn(&format!("skipping cleanup of old versions: {e:#}"));
            return report;
        }
    };

    let stale = select_for_pruning(&instances, &identity.container_name(), config.keep_versions);
    if stale.is_empty() {
        return report;
    }
    reporter.step(&format!(
        "removing {} old version(s) beyond the newest {}...",
        stale.len(),
        config.keep_versions
    ));

    for instance in stale {
        if let Err(reason) = remove(backend, &docker::remove_container(&instance.name)).await {
            tracing::warn!(container = %instance.name, %reason, "failed to prune container");
            report.failed.push((instance.name, reason));
            continue;
        }
        if let Err(reason) = remove(backend, &docker::remove_volume(&instance.volume)).await {
            if reason.to_lowercase().contains("no such volume") {
                tracing::debug!(volume = %instance.volume, "volume already gone");
            } else {
                tracing::warn!(volume = %instance.volume, %reason, "failed to prune volume");
                report.failed.push((instance.volume, reason));
            }
        }
        report.removed.push(instance.name);
    }

    if !report.failed.is_empty() {
        reporter.warn(&format!(
            "{} old resource(s) could not be removed; see the log for details",
            report.failed.len()
        ));
    }
    report
}

async fn remove(backend: &impl ExecutionBackend, command: &str) -> Result<(), String> {
    match backend.exec(command).await {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(stderr_text(&output)),
        Err(e) => Err(format!("{e:#}")),
    }
}
