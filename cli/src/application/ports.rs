//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;

use anyhow::Result;

// ── Execution Backend Port ────────────────────────────────────────────────────

/// The Docker host a deployment targets: the local machine or one remote
/// host over SSH.
///
/// Selected once per invocation. Services never branch on which variant they
/// hold.
#[allow(async_fn_in_trait)]
pub trait ExecutionBackend {
    /// Human label of the target, e.g. `localhost` or `deploy@10.0.0.5`.
    fn target(&self) -> &str;

    /// Run a shell command on the target and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error only when the command could not be run at all. A
    /// command that ran and exited non-zero is `Ok` with a failing status.
    async fn exec(&self, command: &str) -> Result<Output>;

    /// Make a local directory available on the target and return its path
    /// there.
    ///
    /// # Errors
    ///
    /// Returns an error if packing, uploading or extracting fails.
    async fn stage_dir(&self, local: &Path) -> Result<String>;

    /// Release a directory returned by `stage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged copy could not be removed.
    async fn release_dir(&self, staged: &str) -> Result<()>;

    /// Write a scratch file named `name` on the target and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    async fn write_file(&self, name: &str, contents: &[u8]) -> Result<String>;

    /// Remove a file written by `write_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be removed.
    async fn remove_file(&self, path: &str) -> Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Runs local programs. Used by the backends to drive `sh`, `ssh` and `scp`.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Local filesystem access for the build directory and project files.
pub trait LocalFs {
    fn is_dir(&self, path: &Path) -> bool;
    /// Read a UTF-8 file, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>>;
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, content: String) -> Result<()>;
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<()>;
}
