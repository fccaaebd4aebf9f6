//! Application service — code synchronizer.
//!
//! Makes sure the version's data volume (and any extra networks) exist and
//! that the volume holds the build output. Copying is skipped when the
//! entrypoint is already present, unless a copy is forced.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{ExecutionBackend, LocalFs, ProgressReporter};
use crate::application::services::host::{exec_checked, probe};
use crate::domain::config::{DeployKind, DeploymentConfig};
use crate::domain::docker;
use crate::domain::environment::Environment;
use crate::domain::error::ConfigError;
use crate::domain::manifest;

/// Whether build output was copied into the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    AlreadyPresent,
    Copied,
}

/// Create the data volume unless it exists. Returns `true` when created.
///
/// # Errors
///
/// Returns an error if the volume cannot be inspected or created.
pub async fn ensure_volume(backend: &impl ExecutionBackend, config: &DeploymentConfig) -> Result<bool> {
    let volume = config.identity.volume_name();
    if probe(backend, &docker::inspect_volume(&volume)).await? {
        return Ok(false);
    }
    exec_checked(backend, &docker::create_volume(&volume))
        .await
        .with_context(|| format!("creating volume {volume}"))?;
    Ok(true)
}

/// Create every configured network that does not exist yet.
///
/// # Errors
///
/// Returns an error if a network cannot be inspected or created.
pub async fn ensure_networks(backend: &impl ExecutionBackend, config: &DeploymentConfig) -> Result<()> {
    for network in &config.docker.networks {
        if !probe(backend, &docker::inspect_network(network)).await? {
            exec_checked(backend, &docker::create_network(network))
                .await
                .with_context(|| format!("creating network {network}"))?;
        }
    }
    Ok(())
}

/// Copy the build output into the version's volume when it is missing.
///
/// With `force_copy` the presence check is skipped. For dynamic services the
/// entrypoint's environment token is rewritten and a minimized
/// `package.json` is generated first; both files are put back as they were
/// when this function returns, on success or failure.
///
/// # Errors
///
/// Returns `ConfigError::MissingBuildDir` if the build directory is gone, or
/// an error if staging or copying fails.
pub async fn ensure_code(
    backend: &impl ExecutionBackend,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    env: &Environment,
    force_copy: bool,
) -> Result<SyncOutcome> {
    let volume = config.identity.volume_name();

    if !force_copy
        && probe(backend, &docker::probe_entrypoint(&volume, &config.entrypoint)).await?
    {
        tracing::debug!(volume = %volume, "volume already holds the entrypoint");
        return Ok(SyncOutcome::AlreadyPresent);
    }

    if !fs.is_dir(&config.build_dir) {
        return Err(ConfigError::MissingBuildDir(config.build_dir.clone()).into());
    }

    let _prepared = match config.kind {
        DeployKind::DynamicService => prepare_dynamic(fs, reporter, config, env)?,
        DeployKind::StaticAssets => Vec::new(),
    };

    reporter.step(&format!("copying {} into {volume}...", config.build_dir.display()));
    let staged = backend
        .stage_dir(&config.build_dir)
        .await
        .with_context(|| format!("staging {} on {}", config.build_dir.display(), backend.target()))?;

    let copied = exec_checked(backend, &docker::sync_into_volume(&staged, &volume)).await;

    if let Err(e) = backend.release_dir(&staged).await {
        tracing::warn!(staged = %staged, error = %format!("{e:#}"), "failed to release staged build");
    }

    copied.with_context(|| format!("copying build output into {volume}"))?;
    reporter.success(&format!("code synchronized into {volume}"));
    Ok(SyncOutcome::Copied)
}

/// Rewrite the entrypoint token and write the runtime manifest.
fn prepare_dynamic<'a, F: LocalFs>(
    fs: &'a F,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    env: &Environment,
) -> Result<Vec<ScopedFile<'a, F>>> {
    let mut scoped = Vec::new();

    let entry = config.build_dir.join(&config.entrypoint);
    if let Some(source) = fs.read_to_string(&entry)?
        && let Some(rewritten) = manifest::substitute_env_token(&source, env.label_or_default())
    {
        scoped.push(ScopedFile::replace(fs, entry, rewritten)?);
    }

    let root_manifest = config.project_root.join("package.json");
    match fs.read_to_string(&root_manifest)? {
        Some(text) => {
            let root: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", root_manifest.display()))?;
            let minimized = manifest::minimize(
                &root,
                &config.identity.version().to_string(),
                &config.entrypoint,
            );
            let rendered = serde_json::to_string_pretty(&minimized)
                .context("serializing package manifest")?;
            scoped.push(ScopedFile::replace(
                fs,
                config.build_dir.join("package.json"),
                format!("{rendered}\n"),
            )?);
        }
        None => reporter.warn(&format!(
            "{} not found; using the build directory as-is",
            root_manifest.display()
        )),
    }

    Ok(scoped)
}

// ── Scoped file ───────────────────────────────────────────────────────────────

/// A file overwritten for the duration of a deploy.
///
/// On drop the previous content is written back, or the file is removed if
/// it did not exist before.
pub struct ScopedFile<'a, F: LocalFs> {
    fs: &'a F,
    path: PathBuf,
    original: Option<String>,
}

impl<'a, F: LocalFs> ScopedFile<'a, F> {
    /// Write `content` to `path`, remembering what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn replace(fs: &'a F, path: PathBuf, content: String) -> Result<Self> {
        let original = fs.read_to_string(&path)?;
        fs.write(&path, content)?;
        Ok(Self { fs, path, original })
    }
}

impl<F: LocalFs> Drop for ScopedFile<'_, F> {
    fn drop(&mut self) {
        let restored = match self.original.take() {
            Some(content) => self.fs.write(&self.path, content),
            None => self.fs.remove_file(&self.path),
        };
        if let Err(e) = restored {
            tracing::warn!(path = %self.path.display(), error = %format!("{e:#}"), "failed to restore file");
        }
    }
}
