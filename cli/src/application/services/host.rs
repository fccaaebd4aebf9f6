//! Shared Docker host queries and command helpers for the deploy services.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::ExecutionBackend;
use crate::domain::docker;
use crate::domain::environment::Environment;
use crate::domain::error::ExecutionError;
use crate::domain::identity::InstanceIdentity;
use crate::domain::instance::{Instance, parse_listing};

/// Run `command` and fail with `ExecutionError::CommandFailed` unless it
/// exits zero.
///
/// # Errors
///
/// Returns an error if the command cannot be run or exits non-zero.
pub async fn exec_checked(backend: &impl ExecutionBackend, command: &str) -> Result<Output> {
    let output = backend.exec(command).await?;
    if !output.status.success() {
        return Err(ExecutionError::CommandFailed {
            target: backend.target().to_string(),
            command: command.to_string(),
            stderr: stderr_text(&output),
        }
        .into());
    }
    Ok(output)
}

/// Run an idempotent cleanup command. Failures are logged and swallowed;
/// the return value says whether it succeeded.
pub async fn exec_best_effort(backend: &impl ExecutionBackend, command: &str) -> bool {
    match backend.exec(command).await {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            tracing::warn!(
                host = backend.target(),
                command,
                stderr = %stderr_text(&output),
                "cleanup command failed, continuing"
            );
            false
        }
        Err(e) => {
            tracing::warn!(
                host = backend.target(),
                command,
                error = %format!("{e:#}"),
                "cleanup command could not run, continuing"
            );
            false
        }
    }
}

/// `true` when `command` (an inspect-style probe) exits zero.
///
/// # Errors
///
/// Returns an error only if the command cannot be run.
pub async fn probe(backend: &impl ExecutionBackend, command: &str) -> Result<bool> {
    Ok(backend.exec(command).await?.status.success())
}

/// All siblings of `identity` on the host, live and archived.
///
/// # Errors
///
/// Returns an error if the listing command fails.
pub async fn list_instances(
    backend: &impl ExecutionBackend,
    identity: &InstanceIdentity,
) -> Result<Vec<Instance>> {
    let output = exec_checked(backend, &docker::list_siblings(identity))
        .await
        .with_context(|| format!("listing instances of '{}'", identity.base_name()))?;
    Ok(parse_listing(
        identity.base_name(),
        &String::from_utf8_lossy(&output.stdout),
    ))
}

/// Write `env` to `.env.deploy-<container>` on the target host.
///
/// Returns `None` for an empty environment; nothing is written then.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_env_file(
    backend: &impl ExecutionBackend,
    env: &Environment,
    container: &str,
) -> Result<Option<String>> {
    if env.is_empty() {
        return Ok(None);
    }
    let file_name = format!(".env.deploy-{container}");
    Ok(Some(backend.write_file(&file_name, env.render().as_bytes()).await?))
}

/// Remove an env file written by [`write_env_file`]. Failures are logged.
pub async fn discard_env_file(backend: &impl ExecutionBackend, path: Option<&str>) {
    if let Some(path) = path
        && let Err(e) = backend.remove_file(path).await
    {
        tracing::warn!(host = backend.target(), path, error = %format!("{e:#}"), "failed to remove env file");
    }
}

/// Trimmed stderr as text.
#[must_use]
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
