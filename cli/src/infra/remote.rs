//! `ExecutionBackend` for a remote Docker host reached over SSH.
//!
//! Every command is a separate `ssh` invocation in batch mode. Build
//! directories are uploaded as a tarball with `scp` and unpacked under the
//! configured base path.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, ExecutionBackend};
use crate::domain::config::RemoteTarget;
use crate::domain::error::{ConnectionError, ExecutionError};
use crate::domain::shell;
use crate::infra::archive;

/// Prefix of staging directories created under the remote base path.
pub const STAGING_PREFIX: &str = ".rollout-staging-";

pub struct RemoteBackend<R: CommandRunner> {
    runner: R,
    remote: RemoteTarget,
    label: String,
}

impl<R: CommandRunner> RemoteBackend<R> {
    /// Verify the credential and open a first session to `remote`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::MissingCredential` if the configured key
    /// does not exist, or `Unreachable` if the host refuses the session.
    /// A base path that is not absolute is resolved against the remote
    /// `$HOME` here, so every later command sees an absolute path.
    pub async fn connect(runner: R, remote: RemoteTarget) -> Result<Self> {
        if let Some(key) = &remote.private_key
            && !key.exists()
        {
            return Err(ConnectionError::MissingCredential(key.clone()).into());
        }
        let mut backend = Self {
            label: remote.destination(),
            runner,
            remote,
        };

        let output = backend.exec("true").await.map_err(|e| ConnectionError::Unreachable {
            target: backend.label.clone(),
            reason: format!("{e:#}"),
        })?;
        if !output.status.success() {
            return Err(ConnectionError::Unreachable {
                target: backend.label.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        tracing::debug!(host = %backend.label, "ssh session established");

        if let Some(relative) = backend.remote.home_relative_path().map(str::to_string) {
            let home = backend.remote_home().await?;
            backend.remote.base_path = join_under(&home, &relative);
            tracing::debug!(host = %backend.label, base_path = %backend.remote.base_path, "resolved remote base path");
        }
        Ok(backend)
    }

    /// Options shared by `ssh` and `scp`. The port flag differs in case.
    fn common_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![
            port_flag.to_string(),
            self.remote.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(key) = &self.remote.private_key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.common_args("-p");
        args.push(self.remote.destination());
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }

    async fn remote_home(&self) -> Result<String> {
        let output = self
            .exec_ok(r#"printf '%s\n' "$HOME""#)
            .await
            .context("resolving the remote home directory")?;
        let home = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !home.starts_with('/') {
            anyhow::bail!("remote home directory on {} is not absolute: '{home}'", self.label);
        }
        Ok(home)
    }

    fn remote_path(&self, name: &str) -> String {
        format!("{}/{name}", self.remote.base_path.trim_end_matches('/'))
    }

    async fn exec_ok(&self, command: &str) -> Result<Output> {
        let output = self.exec(command).await?;
        if !output.status.success() {
            return Err(ExecutionError::CommandFailed {
                target: self.label.clone(),
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let local = local
            .to_str()
            .with_context(|| format!("path is not valid UTF-8: {}", local.display()))?;
        let mut args = self.common_args("-P");
        args.push(local.to_string());
        args.push(format!("{}:{remote}", self.remote.destination()));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = self.runner.run("scp", &argv).await?;
        if !output.status.success() {
            return Err(ExecutionError::CommandFailed {
                target: self.label.clone(),
                command: format!("scp {local}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn join_under(home: &str, relative: &str) -> String {
    let home = home.trim_end_matches('/');
    match relative.trim_end_matches('/') {
        "" if home.is_empty() => "/".to_string(),
        "" => home.to_string(),
        rest => format!("{home}/{rest}"),
    }
}

impl<R: CommandRunner> ExecutionBackend for RemoteBackend<R> {
    fn target(&self) -> &str {
        &self.label
    }

    async fn exec(&self, command: &str) -> Result<Output> {
        let args = self.ssh_args(command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run("ssh", &argv).await
    }

    async fn stage_dir(&self, local: &Path) -> Result<String> {
        let dir = local.to_path_buf();
        let tarball = tokio::task::spawn_blocking(move || archive::pack_dir(&dir))
            .await
            .context("spawn_blocking for pack_dir")??;

        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%f");
        let staged = self.remote_path(&format!("{STAGING_PREFIX}{stamp}"));
        let remote_archive = format!("{staged}.tar.gz");

        let unpacked = async {
            self.exec_ok(&shell::join(&["mkdir", "-p", &staged])).await?;
            self.upload(tarball.path(), &remote_archive).await?;
            self.exec_ok(&shell::join(&["tar", "-xzf", &remote_archive, "-C", &staged]))
                .await
                .with_context(|| format!("unpacking build on {}", self.label))?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(e) = self.exec_ok(&shell::join(&["rm", "-f", &remote_archive])).await {
            tracing::warn!(host = %self.label, archive = %remote_archive, error = %format!("{e:#}"), "failed to remove uploaded archive");
        }
        if let Err(e) = unpacked {
            if let Err(cleanup) = self.release_dir(&staged).await {
                tracing::warn!(host = %self.label, staged = %staged, error = %format!("{cleanup:#}"), "failed to remove staging directory");
            }
            return Err(e);
        }

        tracing::debug!(host = %self.label, staged = %staged, "build staged");
        Ok(staged)
    }

    async fn release_dir(&self, staged: &str) -> Result<()> {
        self.exec_ok(&shell::join(&["rm", "-rf", staged])).await?;
        Ok(())
    }

    async fn write_file(&self, name: &str, contents: &[u8]) -> Result<String> {
        let path = self.remote_path(name);
        let command = format!(
            "umask 077 && {} && cat > {}",
            shell::join(&["mkdir", "-p", &self.remote.base_path]),
            shell::quote(&path),
        );
        let args = self.ssh_args(&command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.runner.run_with_stdin("ssh", &argv, contents).await?;
        if !output.status.success() {
            return Err(ExecutionError::CommandFailed {
                target: self.label.clone(),
                command: format!("write {path}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(path)
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.exec_ok(&shell::join(&["rm", "-f", path])).await?;
        Ok(())
    }
}
