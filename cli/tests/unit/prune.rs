//! Retention of old versions.

#![allow(clippy::expect_used)]

use std::path::Path;

use rollout_cli::application::services::prune::prune;
use rollout_cli::domain::config::DeploymentConfig;
use serde_json::json;

use crate::helpers::{FakeDockerHost, RecordingReporter, config_at};

fn config(keep: usize) -> DeploymentConfig {
    config_at(
        Path::new("/srv/app"),
        json!({"name": "api", "version": "2.0.0", "port": 4000, "keepVersions": keep}),
    )
}

/// Six old versions, oldest first, plus the current 2.0.0.
fn crowded_host() -> FakeDockerHost {
    let host = FakeDockerHost::new();
    for (minute, version) in ["1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0", "1.5.0"]
        .iter()
        .enumerate()
    {
        let minute = u32::try_from(minute).expect("small");
        host.seed("api", &format!("api-{version}"), false, minute);
    }
    host.seed("api", "api-2.0.0", true, 10);
    host
}

#[tokio::test]
async fn test_prune_removes_oldest_beyond_window() {
    let host = crowded_host();
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(4)).await;

    assert_eq!(report.removed, ["api-1.1.0", "api-1.0.0"]);
    assert!(report.failed.is_empty());
    assert_eq!(
        host.container_names(),
        ["api-1.2.0", "api-1.3.0", "api-1.4.0", "api-1.5.0", "api-2.0.0"]
    );
    assert!(host.volume("api-data-1.0.0").is_none());
    assert!(host.volume("api-data-1.1.0").is_none());
    assert!(host.volume("api-data-1.2.0").is_some());
}

#[tokio::test]
async fn test_prune_never_removes_current() {
    let host = crowded_host();
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(0)).await;

    assert_eq!(report.removed.len(), 6);
    assert_eq!(host.container_names(), ["api-2.0.0"]);
}

#[tokio::test]
async fn test_prune_within_window_is_a_no_op() {
    let host = FakeDockerHost::new();
    host.seed("api", "api-1.0.0", false, 0);
    host.seed("api", "api-2.0.0", true, 1);
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(4)).await;

    assert!(report.is_empty());
    assert!(!host.commands().iter().any(|c| c.starts_with("docker rm")));
}

#[tokio::test]
async fn test_archived_instances_count_toward_retention() {
    let host = FakeDockerHost::new();
    host.seed("api", "api-1.0.0-archived-20260101000000", false, 0);
    host.seed("api", "api-1.0.0", false, 1);
    host.seed("api", "api-2.0.0", true, 2);
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(1)).await;

    assert_eq!(report.removed, ["api-1.0.0-archived-20260101000000"]);
    assert!(host.volume("api-data-1.0.0-archived-20260101000000").is_none());
}

#[tokio::test]
async fn test_volume_failure_is_reported_not_fatal() {
    let host = crowded_host();
    host.fail_volume_rm("Error response from daemon: volume is in use");
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(4)).await;

    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "api-data-1.1.0");
    assert!(reporter.warnings()[0].contains("could not be removed"));
}

#[tokio::test]
async fn test_listing_failure_skips_cleanup() {
    let host = crowded_host();
    host.set_docker_down();
    let reporter = RecordingReporter::default();

    let report = prune(&host, &reporter, &config(4)).await;

    assert!(report.is_empty());
    assert!(reporter.warnings()[0].contains("skipping cleanup"));
    assert_eq!(host.container_names().len(), 7);
}
