//! Production version guard: append-only versions in production.

#![allow(clippy::expect_used)]

use std::path::Path;

use rollout_cli::application::services::rollover::DeployFlags;
use rollout_cli::application::services::version_guard::{GuardDecision, check_production_version};
use rollout_cli::domain::config::DeploymentConfig;
use rollout_cli::domain::environment::Environment;
use rollout_cli::domain::error::VersionGuardError;
use serde_json::json;

use crate::helpers::{FakeDockerHost, RecordingReporter, config_at};

fn production(version: &str) -> DeploymentConfig {
    config_at(
        Path::new("/srv/app"),
        json!({"name": "api", "version": version, "port": 4000, "env": {"NODE_ENV": "production"}}),
    )
}

fn host_with_1_0_and_1_2() -> FakeDockerHost {
    let host = FakeDockerHost::new();
    host.seed("api", "api-1.0.0", false, 0);
    host.seed("api", "api-1.2.0", true, 1);
    host
}

async fn guard(
    host: &FakeDockerHost,
    config: &DeploymentConfig,
    flags: DeployFlags,
) -> (anyhow::Result<GuardDecision>, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let env = Environment::build(None, &config.inline_env);
    let result = check_production_version(host, &reporter, config, &env, flags).await;
    (result, reporter)
}

#[tokio::test]
async fn test_older_version_is_not_monotonic() {
    let host = host_with_1_0_and_1_2();
    let (result, _) = guard(&host, &production("1.1.0"), DeployFlags::default()).await;
    let err = result.expect_err("1.1.0 is older than 1.2.0");
    assert_eq!(
        err.downcast_ref::<VersionGuardError>(),
        Some(&VersionGuardError::NotMonotonic {
            name: "api".into(),
            requested: "1.1.0".into(),
            latest: "1.2.0".into(),
        })
    );
}

#[tokio::test]
async fn test_same_version_is_already_deployed() {
    let host = host_with_1_0_and_1_2();
    let (result, _) = guard(&host, &production("1.2.0"), DeployFlags::default()).await;
    let err = result.expect_err("1.2.0 exists");
    assert!(matches!(
        err.downcast_ref::<VersionGuardError>(),
        Some(VersionGuardError::AlreadyDeployed { .. })
    ));
}

#[tokio::test]
async fn test_newer_version_passes() {
    let host = host_with_1_0_and_1_2();
    let (result, _) = guard(&host, &production("1.3.0"), DeployFlags::default()).await;
    assert_eq!(result.expect("1.3.0 is newer"), GuardDecision::Passed);
}

#[tokio::test]
async fn test_archived_siblings_count() {
    let host = FakeDockerHost::new();
    host.seed("api", "api-2.0.0-archived-20260101000000", false, 0);
    let (result, _) = guard(&host, &production("2.0.0"), DeployFlags::default()).await;
    assert!(result.is_err(), "an archived 2.0.0 still blocks a production 2.0.0");
}

#[tokio::test]
async fn test_other_services_sharing_a_prefix_are_ignored() {
    let host = FakeDockerHost::new();
    host.seed("api-worker", "api-worker-9.0.0", true, 0);
    let (result, _) = guard(&host, &production("1.0.0"), DeployFlags::default()).await;
    assert_eq!(result.expect("no api siblings"), GuardDecision::Passed);
}

#[tokio::test]
async fn test_force_bypasses_with_warning() {
    let host = host_with_1_0_and_1_2();
    let flags = DeployFlags {
        force: true,
        recreate: false,
    };
    let (result, reporter) = guard(&host, &production("1.0.0"), flags).await;
    assert_eq!(result.expect("bypassed"), GuardDecision::Bypassed);
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("--force"), "got: {warnings:?}");
}

#[tokio::test]
async fn test_rm_bypasses() {
    let host = host_with_1_0_and_1_2();
    let flags = DeployFlags {
        force: true,
        recreate: true,
    };
    let (result, reporter) = guard(&host, &production("1.2.0"), flags).await;
    assert_eq!(result.expect("bypassed"), GuardDecision::Bypassed);
    assert!(reporter.warnings()[0].contains("--rm"));
}

#[tokio::test]
async fn test_non_production_skips_listing() {
    let host = host_with_1_0_and_1_2();
    let config = config_at(
        Path::new("/srv/app"),
        json!({"name": "api", "version": "1.0.0", "port": 4000, "env": {"NODE_ENV": "staging"}}),
    );
    let (result, _) = guard(&host, &config, DeployFlags::default()).await;
    assert_eq!(result.expect("not production"), GuardDecision::NotProduction);
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_custom_production_markers() {
    let host = host_with_1_0_and_1_2();
    let config = config_at(
        Path::new("/srv/app"),
        json!({
            "name": "api", "version": "1.0.0", "port": 4000,
            "env": {"ENV": "Live"},
            "productionMarkers": ["live"]
        }),
    );
    let (result, _) = guard(&host, &config, DeployFlags::default()).await;
    assert!(result.is_err(), "ENV=Live matches the custom marker");
}
