//! Launch executor: `docker run` and its failure modes.

#![allow(clippy::expect_used)]

use std::path::Path;

use rollout_cli::application::services::launch::launch;
use rollout_cli::application::services::rollover::SlotOutcome;
use rollout_cli::domain::config::DeploymentConfig;
use rollout_cli::domain::environment::Environment;
use rollout_cli::domain::error::ExecutionError;
use serde_json::json;

use crate::helpers::{FakeDockerHost, RecordingReporter, config_at};

fn config(env: serde_json::Value) -> DeploymentConfig {
    config_at(
        Path::new("/srv/app"),
        json!({"name": "api", "version": "2.0.0", "port": 4000, "env": env}),
    )
}

#[tokio::test]
async fn test_launch_starts_container_with_env_file() {
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();
    let config = config(json!({"NODE_ENV": "production", "PORT": 3000}));
    let env = Environment::build(None, &config.inline_env);

    let run = launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect("launch");

    assert_eq!(run.container_name, "api-2.0.0");
    assert!(!run.container_id.is_empty());
    let container = host.container("api-2.0.0").expect("container");
    assert!(container.running);
    assert_eq!(container.volume.as_deref(), Some("api-data-2.0.0"));
    assert_eq!(
        container.env_file.as_deref(),
        Some("NODE_ENV=production\nPORT=3000\n")
    );
    assert_eq!(host.leftovers(), (0, 0), "env file removed after the run");
}

#[tokio::test]
async fn test_empty_environment_writes_no_env_file() {
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect("launch");

    let run = host
        .commands()
        .into_iter()
        .find(|c| c.starts_with("docker run -d"))
        .expect("run command");
    assert!(!run.contains("--env-file"), "got: {run}");
}

#[tokio::test]
async fn test_empty_slot_issues_no_removal() {
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect("launch");

    assert!(
        !host.commands().iter().any(|c| c.starts_with("docker rm")),
        "nothing to remove on an empty slot: {:?}",
        host.commands()
    );
}

#[tokio::test]
async fn test_running_occupant_is_a_name_conflict() {
    let host = FakeDockerHost::new();
    host.seed("api", "api-2.0.0", true, 0);
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    let err = launch(&host, &reporter, &config, &env, &SlotOutcome::Occupied { running: true })
        .await
        .expect_err("conflict");
    assert!(matches!(
        err.downcast_ref::<ExecutionError>(),
        Some(ExecutionError::NameConflict(name)) if name == "api-2.0.0"
    ));
    assert!(host.commands().is_empty(), "nothing is touched");
}

#[tokio::test]
async fn test_stopped_occupant_is_replaced() {
    let host = FakeDockerHost::new();
    host.seed("api", "api-2.0.0", false, 0);
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    launch(&host, &reporter, &config, &env, &SlotOutcome::Occupied { running: false })
        .await
        .expect("launch");

    let container = host.container("api-2.0.0").expect("container");
    assert!(container.running);
}

#[tokio::test]
async fn test_daemon_conflict_maps_to_name_conflict() {
    let host = FakeDockerHost::new();
    host.fail_next_run("docker: Error response from daemon: Conflict. The container name \"/api-2.0.0\" is already in use by container \"f00\".");
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    let err = launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect_err("conflict");
    assert!(matches!(
        err.downcast_ref::<ExecutionError>(),
        Some(ExecutionError::NameConflict(_))
    ));
}

#[tokio::test]
async fn test_run_failure_carries_stderr_and_cleans_env_file() {
    let host = FakeDockerHost::new();
    host.fail_next_run("docker: Error response from daemon: pull access denied for nope");
    let reporter = RecordingReporter::default();
    let config = config(json!({"A": "1"}));
    let env = Environment::build(None, &config.inline_env);

    let err = launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect_err("launch fails");
    match err.downcast_ref::<ExecutionError>() {
        Some(ExecutionError::LaunchFailed { name, stderr }) => {
            assert_eq!(name, "api-2.0.0");
            assert!(stderr.contains("pull access denied"));
        }
        other => panic!("expected LaunchFailed, got {other:?}"),
    }
    assert_eq!(host.leftovers(), (0, 0));
}

#[tokio::test]
async fn test_informational_stderr_is_a_warning() {
    let host = FakeDockerHost::new();
    host.warn_on_run("Unable to find image 'node:lts-slim' locally");
    let reporter = RecordingReporter::default();
    let config = config(json!({}));
    let env = Environment::build(None, &config.inline_env);

    launch(&host, &reporter, &config, &env, &SlotOutcome::Empty)
        .await
        .expect("launch succeeds");
    assert!(reporter.warnings()[0].contains("Unable to find image"));
}
