//! Application service — production version guard.
//!
//! Read-only: the only backend call is the sibling listing.

use anyhow::Result;

use crate::application::ports::{ExecutionBackend, ProgressReporter};
use crate::application::services::host::list_instances;
use crate::application::services::rollover::DeployFlags;
use crate::domain::config::DeploymentConfig;
use crate::domain::environment::Environment;
use crate::domain::instance::check_monotonic;

/// How the guard treated this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The environment is not a production environment.
    NotProduction,
    /// Production, but `--force` or `--rm` was given.
    Bypassed,
    /// Production and the version is strictly newer than every sibling.
    Passed,
}

/// Decide whether `config`'s version may be deployed.
///
/// # Errors
///
/// Returns `VersionGuardError::AlreadyDeployed` or `NotMonotonic` in
/// production without a bypass flag, or an error if the listing fails.
pub async fn check_production_version(
    backend: &impl ExecutionBackend,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    env: &Environment,
    flags: DeployFlags,
) -> Result<GuardDecision> {
    if !env.is_production(&config.production_markers) {
        return Ok(GuardDecision::NotProduction);
    }

    if flags.force || flags.recreate {
        let flag = if flags.recreate { "--rm" } else { "--force" };
        reporter.warn(&format!(
            "production version guard bypassed by {flag} for {}",
            config.identity.container_name()
        ));
        tracing::info!(flag, "version guard bypassed");
        return Ok(GuardDecision::Bypassed);
    }

    reporter.step("checking deployed versions...");
    let instances = list_instances(backend, &config.identity).await?;
    check_monotonic(&config.identity, &instances)?;
    Ok(GuardDecision::Passed)
}
