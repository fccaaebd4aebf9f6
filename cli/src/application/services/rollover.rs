//! Application service — rollover of the slot being redeployed.
//!
//! Applies `--rm` (destroy) or `--force` (archive) to an existing instance of
//! the requested version, then stops the other versions so only one serves
//! traffic.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::application::ports::{ExecutionBackend, ProgressReporter};
use crate::application::services::host::{
    discard_env_file, exec_best_effort, exec_checked, list_instances, probe, stderr_text,
    write_env_file,
};
use crate::domain::config::DeploymentConfig;
use crate::domain::docker;
use crate::domain::environment::Environment;
use crate::domain::error::ExecutionError;

/// Operator flags that relax redeploy rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployFlags {
    /// `--force`: archive an existing instance of this version and overwrite.
    pub force: bool,
    /// `--rm`: destroy an existing instance of this version and its data.
    pub recreate: bool,
}

/// State of the target slot after `prepare_slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// No container held the name.
    Empty,
    /// `--rm` removed the container and its volume.
    Destroyed,
    /// `--force` replaced the container with a stopped archive that owns a
    /// backup of its volume.
    Archived { container: String, volume: String },
    /// An instance holds the name and no flag was given.
    Occupied { running: bool },
}

/// Archive or destroy the current instance of the requested version.
///
/// With `--rm` the container and volume are removed; a missing container is
/// not an error but a volume that survives removal is. With `--force` the
/// container is stopped and its data volume copied into a timestamped backup
/// volume. A stopped archive container is then created with the deployment's
/// options and `env`, mounting the backup, and the old container is removed.
/// The original volume is left unattached and re-synchronized afterwards.
///
/// # Errors
///
/// Returns an error if the listing, backup copy, archive creation, or volume
/// destruction fails.
pub async fn prepare_slot(
    backend: &impl ExecutionBackend,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    env: &Environment,
    flags: DeployFlags,
    now: DateTime<Utc>,
) -> Result<SlotOutcome> {
    let identity = &config.identity;
    let name = identity.container_name();
    let volume = identity.volume_name();

    if flags.recreate {
        reporter.step(&format!("removing {name} and its data..."));
        exec_best_effort(backend, &docker::remove_container(&name)).await;
        destroy_volume(backend, &volume).await?;
        return Ok(SlotOutcome::Destroyed);
    }

    let current = list_instances(backend, identity)
        .await?
        .into_iter()
        .find(|i| i.name == name);
    let Some(current) = current else {
        return Ok(SlotOutcome::Empty);
    };

    if !flags.force {
        return Ok(SlotOutcome::Occupied {
            running: current.running,
        });
    }

    let archive = identity.archive_name(now);
    let archive_volume = identity.archive_volume_name(now);
    reporter.step(&format!("archiving {name} as {archive}..."));

    if current.running {
        exec_checked(backend, &docker::stop_container(&name))
            .await
            .with_context(|| format!("stopping {name} before archiving"))?;
    }

    exec_checked(backend, &docker::create_volume(&archive_volume))
        .await
        .with_context(|| format!("creating backup volume {archive_volume}"))?;
    if probe(backend, &docker::inspect_volume(&volume)).await? {
        exec_checked(backend, &docker::copy_volume(&volume, &archive_volume))
            .await
            .with_context(|| format!("backing up {volume} into {archive_volume}"))?;
    } else {
        tracing::info!(volume = %volume, "no data volume to back up");
    }

    let env_path = write_env_file(backend, env, &archive).await?;
    let created = exec_checked(
        backend,
        &docker::create_archive(config, &archive, &archive_volume, env_path.as_deref()),
    )
    .await;
    discard_env_file(backend, env_path.as_deref()).await;
    created.with_context(|| format!("creating archive container {archive}"))?;

    exec_checked(backend, &docker::remove_container(&name))
        .await
        .with_context(|| format!("removing {name} after archiving"))?;

    reporter.success(&format!("archived {name} as {archive}"));
    Ok(SlotOutcome::Archived {
        container: archive,
        volume: archive_volume,
    })
}

/// Stop every running sibling except the requested version.
///
/// Failures are logged and skipped. Returns the names that were stopped.
///
/// # Errors
///
/// Returns an error only if the sibling listing fails.
pub async fn stop_siblings(
    backend: &impl ExecutionBackend,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
) -> Result<Vec<String>> {
    let current = config.identity.container_name();
    let mut stopped = Vec::new();
    for instance in list_instances(backend, &config.identity).await? {
        if !instance.running || instance.name == current {
            continue;
        }
        reporter.step(&format!("stopping {}...", instance.name));
        if exec_best_effort(backend, &docker::stop_container(&instance.name)).await {
            stopped.push(instance.name);
        }
    }
    Ok(stopped)
}

async fn destroy_volume(backend: &impl ExecutionBackend, volume: &str) -> Result<()> {
    let output = backend.exec(&docker::remove_volume(volume)).await?;
    if output.status.success() || !probe(backend, &docker::inspect_volume(volume)).await? {
        return Ok(());
    }
    Err(ExecutionError::CommandFailed {
        target: backend.target().to_string(),
        command: docker::remove_volume(volume),
        stderr: stderr_text(&output),
    }
    .into())
}
