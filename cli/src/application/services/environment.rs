//! Application service — environment builder.

use anyhow::{Context, Result};

use crate::application::ports::LocalFs;
use crate::domain::config::DeploymentConfig;
use crate::domain::environment::Environment;

/// Merge the configured env file (if present) with the inline variables.
///
/// A configured but missing env file is skipped.
///
/// # Errors
///
/// Returns an error if the env file exists but cannot be read.
pub fn build_environment(fs: &impl LocalFs, config: &DeploymentConfig) -> Result<Environment> {
    let file_content = match &config.env_file {
        Some(path) => {
            let content = fs
                .read_to_string(path)
                .with_context(|| format!("reading env file {}", path.display()))?;
            if content.is_none() {
                tracing::debug!(path = %path.display(), "env file not found, skipping");
            }
            content
        }
        None => None,
    };
    Ok(Environment::build(
        file_content.as_deref(),
        &config.inline_env,
    ))
}
