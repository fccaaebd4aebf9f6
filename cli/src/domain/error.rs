//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while loading or resolving a deployment document.
///
/// Always fatal, and always raised before anything touches the target host.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file '{}': {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("invalid configuration in '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("missing required field '{0}' in configuration")]
    MissingField(&'static str),

    #[error("invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("invalid name '{0}': must match ^[a-zA-Z0-9][a-zA-Z0-9_.-]*$")]
    InvalidName(String),

    #[error("build directory '{}' does not exist", .0.display())]
    MissingBuildDir(PathBuf),

    #[error("invalid remote path '{0}': use an absolute path or one under '~/'")]
    InvalidRemotePath(String),
}

// ── Version guard errors ──────────────────────────────────────────────────────

/// Production redeploy refusals. Bypassed with `--force` or `--rm`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionGuardError {
    #[error(
        "version {version} of '{name}' is already deployed in production. \
         Use --force to archive it or --rm to replace it."
    )]
    AlreadyDeployed { name: String, version: String },

    #[error(
        "version {requested} of '{name}' is not newer than the deployed version {latest}. \
         Production deploys must increase the version."
    )]
    NotMonotonic {
        name: String,
        requested: String,
        latest: String,
    },
}

// ── Connection errors ─────────────────────────────────────────────────────────

/// Errors establishing a session with a remote host.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("SSH credential '{}' not found", .0.display())]
    MissingCredential(PathBuf),

    #[error("cannot connect to {target}: {reason}")]
    Unreachable { target: String, reason: String },
}

// ── Execution errors ──────────────────────────────────────────────────────────

/// Failures reported by commands executed on the target host.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("command failed on {target}: {command}\n{stderr}")]
    CommandFailed {
        target: String,
        command: String,
        stderr: String,
    },

    #[error("container '{name}' failed to launch:\n{stderr}")]
    LaunchFailed { name: String, stderr: String },

    #[error(
        "container '{0}' is already running. \
         Use --force to archive it or --rm to replace it."
    )]
    NameConflict(String),

    #[error("Docker is not available on {target}: {reason}")]
    DockerUnavailable { target: String, reason: String },
}
