//! `rollout --file <path>` — deploy one version of a service.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::ExecutionBackend;
use crate::application::services::code_sync::SyncOutcome;
use crate::application::services::deploy::{self as service, DeployOutcome, DeployRequest};
use crate::application::services::rollover::{DeployFlags, SlotOutcome};
use crate::application::services::version_guard::GuardDecision;
use crate::domain::config::DeploymentConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config;
use crate::infra::fs::StdFs;
use crate::infra::local::LocalBackend;
use crate::infra::remote::RemoteBackend;
use crate::output::{OutputContext, TerminalReporter};

/// Parsed deploy arguments.
#[derive(Debug, Clone)]
pub struct DeployArgs {
    pub file: PathBuf,
    pub flags: DeployFlags,
}

/// Run a deployment.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the target cannot be
/// reached, or any deployment step fails.
pub async fn run(ctx: &OutputContext, args: &DeployArgs) -> Result<()> {
    let config = config::load(&args.file)?;
    tracing::info!(
        name = config.identity.base_name(),
        version = %config.identity.version(),
        host = config.target_label(),
        force = args.flags.force,
        recreate = args.flags.recreate,
        "starting deployment"
    );
    ctx.header(&format!(
        "Deploying {} to {}",
        config.identity.container_name(),
        config.target_label()
    ));

    let runner = TokioCommandRunner::new();
    let outcome = match &config.remote {
        Some(remote) => {
            let backend = RemoteBackend::connect(runner, remote.clone()).await?;
            deploy_on(ctx, &backend, &config, args.flags).await?
        }
        None => {
            let backend = LocalBackend::new(runner)?;
            deploy_on(ctx, &backend, &config, args.flags).await?
        }
    };

    print_summary(ctx, &outcome);
    Ok(())
}

async fn deploy_on(
    ctx: &OutputContext,
    backend: &impl ExecutionBackend,
    config: &DeploymentConfig,
    flags: DeployFlags,
) -> Result<DeployOutcome> {
    let reporter = TerminalReporter::new(ctx);
    service::deploy(
        backend,
        &StdFs,
        &reporter,
        DeployRequest {
            config,
            flags,
            now: Utc::now(),
        },
    )
    .await
}

fn print_summary(ctx: &OutputContext, outcome: &DeployOutcome) {
    if ctx.quiet {
        return;
    }
    ctx.success(&format!("Deployed {}", outcome.run.container_name));
    ctx.kv("URL", &outcome.url);
    ctx.kv("Container", &short_id(&outcome.run.container_id));
    ctx.kv(
        "Volume",
        &match (outcome.volume_created, outcome.sync) {
            (true, _) => format!("{} (new)", outcome.volume),
            (false, SyncOutcome::Copied) => format!("{} (refreshed)", outcome.volume),
            (false, SyncOutcome::AlreadyPresent) => format!("{} (reused)", outcome.volume),
        },
    );
    match outcome.guard {
        GuardDecision::Passed => ctx.kv("Guard", "production version check passed"),
        GuardDecision::Bypassed => ctx.kv("Guard", "production version check bypassed"),
        GuardDecision::NotProduction => {}
    }
    match &outcome.slot {
        SlotOutcome::Archived { container, volume } => {
            ctx.kv("Archived", &format!("{container} (data backup in {volume})"));
        }
        SlotOutcome::Destroyed => ctx.kv("Replaced", "previous instance and data removed"),
        SlotOutcome::Empty | SlotOutcome::Occupied { .. } => {}
    }
    if !outcome.stopped.is_empty() {
        ctx.kv("Stopped", &outcome.stopped.join(", "));
    }
    if !outcome.pruned.removed.is_empty() {
        ctx.kv("Pruned", &outcome.pruned.removed.join(", "));
    }
}

/// Docker's 12-character short form of a container id.
fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}
