//! Application service — the deploy use-case.
//!
//! Sequences guard → rollover → sibling stop → volume/networks → code sync →
//! launch → prune. Each step finishes before the next starts; nothing is
//! rolled back if a later step fails.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::application::ports::{ExecutionBackend, LocalFs, ProgressReporter};
use crate::application::services::code_sync::{self, SyncOutcome};
use crate::application::services::environment::build_environment;
use crate::application::services::host::stderr_text;
use crate::application::services::launch::{RunResult, launch};
use crate::application::services::prune::{PruneReport, prune};
use crate::application::services::rollover::{self, DeployFlags, SlotOutcome};
use crate::application::services::version_guard::{GuardDecision, check_production_version};
use crate::domain::config::DeploymentConfig;
use crate::domain::docker;
use crate::domain::error::{ConfigError, ExecutionError};

/// Inputs of one deployment.
pub struct DeployRequest<'a> {
    pub config: &'a DeploymentConfig,
    pub flags: DeployFlags,
    /// Timestamp used for archive names.
    pub now: DateTime<Utc>,
}

/// Everything that happened during a successful deployment.
#[derive(Debug)]
pub struct DeployOutcome {
    pub run: RunResult,
    pub volume: String,
    pub guard: GuardDecision,
    pub slot: SlotOutcome,
    pub stopped: Vec<String>,
    pub volume_created: bool,
    pub sync: SyncOutcome,
    pub pruned: PruneReport,
    pub url: String,
}

/// Deploy `request.config` to the host behind `backend`.
///
/// # Errors
///
/// Returns `ConfigError` and `VersionGuardError` before anything is changed
/// on the host, and `ExecutionError` (or a contextual error) from the step
/// that failed otherwise.
pub async fn deploy(
    backend: &impl ExecutionBackend,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    request: DeployRequest<'_>,
) -> Result<DeployOutcome> {
    let DeployRequest { config, flags, now } = request;
    let identity = &config.identity;

    if !fs.is_dir(&config.build_dir) {
        return Err(ConfigError::MissingBuildDir(config.build_dir.clone()).into());
    }
    let env = build_environment(fs, config)?;

    check_docker(backend).await?;

    let guard = check_production_version(backend, reporter, config, &env, flags).await?;

    let slot = rollover::prepare_slot(backend, reporter, config, &env, flags, now)
        .await
        .context("preparing deployment slot")?;
    let stopped = rollover::stop_siblings(backend, reporter, config).await?;

    let volume_created = code_sync::ensure_volume(backend, config).await?;
    code_sync::ensure_networks(backend, config).await?;

    let force_copy = flags.force || flags.recreate;
    let sync = code_sync::ensure_code(backend, fs, reporter, config, &env, force_copy).await?;

    let run = launch(backend, reporter, config, &env, &slot).await?;

    let pruned = prune(backend, reporter, config).await;

    Ok(DeployOutcome {
        run,
        volume: identity.volume_name(),
        guard,
        slot,
        stopped,
        volume_created,
        sync,
        pruned,
        url: format!("http://{}:{}", config.target_label(), config.port),
    })
}

/// Fail early with a clear message when the Docker daemon is unreachable.
async fn check_docker(backend: &impl ExecutionBackend) -> Result<()> {
    let output = backend.exec(&docker::server_version()).await?;
    if output.status.success() {
        tracing::debug!(
            host = backend.target(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "docker daemon reachable"
        );
        return Ok(());
    }
    Err(ExecutionError::DockerUnavailable {
        target: backend.target().to_string(),
        reason: stderr_text(&output),
    }
    .into())
}
