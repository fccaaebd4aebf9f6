//! Code synchronization into the version's data volume.

#![allow(clippy::expect_used)]

use rollout_cli::application::services::code_sync::{
    SyncOutcome, ensure_code, ensure_networks, ensure_volume,
};
use rollout_cli::domain::config::DeploymentConfig;
use rollout_cli::domain::environment::Environment;
use rollout_cli::domain::error::ConfigError;
use rollout_cli::infra::fs::StdFs;
use serde_json::json;

use crate::helpers::{FakeDockerHost, RecordingReporter, config_at, project};

fn env_of(config: &DeploymentConfig) -> Environment {
    Environment::build(None, &config.inline_env)
}

#[tokio::test]
async fn test_first_sync_copies_and_second_is_a_no_op() {
    let dir = project();
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();
    let env = env_of(&config);

    assert!(ensure_volume(&host, &config).await.expect("volume"));
    let first = ensure_code(&host, &StdFs, &reporter, &config, &env, false)
        .await
        .expect("sync");
    assert_eq!(first, SyncOutcome::Copied);
    assert_eq!(host.sync_count(), 1);

    assert!(!ensure_volume(&host, &config).await.expect("volume"));
    let second = ensure_code(&host, &StdFs, &reporter, &config, &env, false)
        .await
        .expect("sync");
    assert_eq!(second, SyncOutcome::AlreadyPresent);
    assert_eq!(host.sync_count(), 1, "no copy when the entrypoint is present");
}

#[tokio::test]
async fn test_force_copy_skips_presence_check() {
    let dir = project();
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    host.put_file("api-data-1.0.0", "index.js", "stale");
    let reporter = RecordingReporter::default();

    let outcome = ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), true)
        .await
        .expect("sync");
    assert_eq!(outcome, SyncOutcome::Copied);
    let volume = host.volume("api-data-1.0.0").expect("volume");
    assert_ne!(volume.get("index.js").map(String::as_str), Some("stale"));
}

#[tokio::test]
async fn test_dynamic_sync_rewrites_token_and_minimizes_manifest() {
    let dir = project();
    let config = config_at(
        dir.path(),
        json!({"name": "api", "version": "1.4.0", "port": 4000, "env": {"NODE_ENV": "production"}}),
    );
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect("sync");

    let volume = host.volume("api-data-1.4.0").expect("volume");
    assert_eq!(
        volume.get("index.js").map(String::as_str),
        Some("const env = 'production';\n")
    );
    let manifest: serde_json::Value =
        serde_json::from_str(volume.get("package.json").expect("manifest")).expect("json");
    assert_eq!(manifest["version"], "1.4.0");
    assert_eq!(manifest["main"], "index.js");
    assert_eq!(manifest["dependencies"]["express"], "^4");
    assert!(manifest.get("scripts").is_none());
}

#[tokio::test]
async fn test_local_files_are_restored_after_sync() {
    let dir = project();
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect("sync");

    let entry = std::fs::read_to_string(dir.path().join("build/index.js")).expect("read");
    assert_eq!(entry, "const env = '__DEPLOY_ENV__';\n");
    assert!(
        !dir.path().join("build/package.json").exists(),
        "generated manifest is removed"
    );
    assert_eq!(host.leftovers(), (0, 0), "staged directory is released");
}

#[tokio::test]
async fn test_existing_build_manifest_is_put_back() {
    let dir = project();
    std::fs::write(dir.path().join("build/package.json"), "{\"keep\":true}").expect("write");
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect("sync");

    let restored = std::fs::read_to_string(dir.path().join("build/package.json")).expect("read");
    assert_eq!(restored, "{\"keep\":true}");
}

#[tokio::test]
async fn test_missing_root_manifest_warns() {
    let dir = project();
    std::fs::remove_file(dir.path().join("package.json")).expect("remove");
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    let outcome = ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect("sync");
    assert_eq!(outcome, SyncOutcome::Copied);
    assert!(reporter.warnings()[0].contains("package.json"));
}

#[tokio::test]
async fn test_static_assets_are_copied_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("public")).expect("mkdir");
    std::fs::write(dir.path().join("public/index.html"), "<p>__DEPLOY_ENV__</p>").expect("write");
    let config = config_at(
        dir.path(),
        json!({"name": "site", "version": "3.0.0", "port": 8080, "deployType": "static", "buildDir": "public"}),
    );
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect("sync");

    let volume = host.volume("site-data-3.0.0").expect("volume");
    assert_eq!(
        volume.get("index.html").map(String::as_str),
        Some("<p>__DEPLOY_ENV__</p>")
    );
    assert!(!volume.contains_key("package.json"));
}

#[tokio::test]
async fn test_missing_build_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_at(dir.path(), json!({"name": "api", "version": "1.0.0", "port": 4000}));
    let host = FakeDockerHost::new();
    let reporter = RecordingReporter::default();

    let err = ensure_code(&host, &StdFs, &reporter, &config, &env_of(&config), false)
        .await
        .expect_err("no build dir");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingBuildDir(_))
    ));
    assert_eq!(host.sync_count(), 0);
}

#[tokio::test]
async fn test_networks_are_created_once() {
    let config = config_at(
        std::path::Path::new("/srv/app"),
        json!({"name": "api", "version": "1.0.0", "port": 4000, "dockerOptions": {"networks": ["backend", "edge"]}}),
    );
    let host = FakeDockerHost::new();

    ensure_networks(&host, &config).await.expect("networks");
    ensure_networks(&host, &config).await.expect("networks");

    assert_eq!(host.networks(), ["backend", "edge"]);
    let creates = host
        .commands()
        .iter()
        .filter(|c| c.starts_with("docker network create"))
        .count();
    assert_eq!(creates, 2);
}
