//! Loads the deployment document from disk.

use std::path::{Path, PathBuf};

use crate::domain::config::{DeploymentConfig, DeploymentDocument, resolve};
use crate::domain::error::ConfigError;

/// Read, parse and resolve the JSON deployment document at `path`.
///
/// Relative paths inside the document are anchored at the directory holding
/// it; paths starting with `~` are expanded to the home directory.
///
/// # Errors
///
/// Returns `ConfigError::Read` if the file cannot be read, `Parse` if it is
/// not a valid document, and any resolution error.
pub fn load(path: &Path) -> Result<DeploymentConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let doc: DeploymentDocument =
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let project_root = project_root(path);
    tracing::debug!(path = %path.display(), root = %project_root.display(), "loaded deployment document");

    let mut config = resolve(doc, &project_root)?;
    config.build_dir = expand_home(config.build_dir);
    config.env_file = config.env_file.map(expand_home);
    if let Some(remote) = config.remote.as_mut() {
        remote.private_key = remote.private_key.take().map(expand_home);
    }
    Ok(config)
}

fn project_root(path: &Path) -> PathBuf {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
}

/// Replace a leading `~` with the home directory.
#[must_use]
pub fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}
