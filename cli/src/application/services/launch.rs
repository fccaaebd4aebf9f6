//! Application service — launch executor.

use anyhow::Result;

use crate::application::ports::{ExecutionBackend, ProgressReporter};
use crate::application::services::host::{
    discard_env_file, exec_best_effort, stderr_text, write_env_file,
};
use crate::application::services::rollover::SlotOutcome;
use crate::domain::config::DeploymentConfig;
use crate::domain::docker;
use crate::domain::environment::Environment;
use crate::domain::error::ExecutionError;

/// Docker's message when a container name is taken.
const NAME_IN_USE: &str = "is already in use by container";

/// A started container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub container_name: String,
    pub container_id: String,
}

/// Start the new container.
///
/// A running occupant of the name (left by a run without `--force`/`--rm`)
/// is a `NameConflict`; a stopped one is stale and removed first. The env
/// file is written only for a non-empty environment and removed again after
/// the run.
///
/// # Errors
///
/// Returns `ExecutionError::NameConflict` or `LaunchFailed`, or an error if
/// the env file cannot be written.
pub async fn launch(
    backend: &impl ExecutionBackend,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    env: &Environment,
    slot: &SlotOutcome,
) -> Result<RunResult> {
    let name = config.identity.container_name();

    if matches!(slot, SlotOutcome::Occupied { running: true }) {
        return Err(ExecutionError::NameConflict(name).into());
    }
    if matches!(slot, SlotOutcome::Occupied { .. }) {
        exec_best_effort(backend, &docker::remove_container(&name)).await;
    }

    let env_path = write_env_file(backend, env, &name).await?;

    reporter.step(&format!("starting {name}..."));
    let run = backend
        .exec(&docker::run_container(config, env_path.as_deref()))
        .await;
    discard_env_file(backend, env_path.as_deref()).await;

    let output = run?;
    let stderr = stderr_text(&output);
    let container_id = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    if !output.status.success() || (container_id.is_empty() && !stderr.is_empty()) {
        if stderr.contains(NAME_IN_USE) {
            return Err(ExecutionError::NameConflict(name).into());
        }
        return Err(ExecutionError::LaunchFailed { name, stderr }.into());
    }
    if !stderr.is_empty() {
        reporter.warn(&format!("docker reported while starting {name}: {stderr}"));
    }

    reporter.success(&format!("{name} started"));
    Ok(RunResult {
        container_name: name,
        container_id,
    })
}
