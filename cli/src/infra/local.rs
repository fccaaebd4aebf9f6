//! `ExecutionBackend` for the Docker daemon on this machine.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::application::ports::{CommandRunner, ExecutionBackend};

/// Runs commands through the local `sh`.
///
/// Build directories are bind-mounted in place, so staging only resolves an
/// absolute path. Scratch files live in a private temporary directory that is
/// deleted with the backend.
pub struct LocalBackend<R: CommandRunner> {
    runner: R,
    scratch: TempDir,
}

impl<R: CommandRunner> LocalBackend<R> {
    /// # Errors
    ///
    /// Returns an error if the scratch directory cannot be created.
    pub fn new(runner: R) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("rollout-")
            .tempdir()
            .context("creating scratch directory")?;
        Ok(Self { runner, scratch })
    }
}

impl<R: CommandRunner> ExecutionBackend for LocalBackend<R> {
    fn target(&self) -> &str {
        "localhost"
    }

    async fn exec(&self, command: &str) -> Result<Output> {
        self.runner.run("sh", &["-c", command]).await
    }

    async fn stage_dir(&self, local: &Path) -> Result<String> {
        let absolute = tokio::fs::canonicalize(local)
            .await
            .with_context(|| format!("resolving {}", local.display()))?;
        absolute
            .to_str()
            .map(str::to_string)
            .with_context(|| format!("path is not valid UTF-8: {}", absolute.display()))
    }

    async fn release_dir(&self, _staged: &str) -> Result<()> {
        Ok(())
    }

    async fn write_file(&self, name: &str, contents: &[u8]) -> Result<String> {
        let path = self.scratch.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("setting permissions on {}", path.display()))?;
        }
        path.to_str()
            .map(str::to_string)
            .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("removing {path}"))
    }
}
