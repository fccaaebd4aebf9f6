//! Argument parsing, exit codes, and configuration errors of the binary.

#![allow(clippy::expect_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn rollout() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rollout"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("deploy.json");
    std::fs::write(&path, body).expect("write config");
    path
}

// --- Help and version ---

#[test]
fn test_help_flag_shows_usage_and_exits_zero() {
    rollout()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--file"))
        .stdout(predicate::str::contains("--rm"));
}

#[test]
fn test_version_flag_exits_zero() {
    rollout()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rollout"));
}

// --- Usage errors exit 1 ---

#[test]
fn test_missing_file_flag_exits_one() {
    rollout()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--file"));
}

#[test]
fn test_unknown_flag_exits_one() {
    rollout()
        .args(["--file=deploy.json", "--bogus"])
        .assert()
        .code(1);
}

// --- Configuration errors exit 1 before touching any host ---

#[test]
fn test_nonexistent_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    rollout()
        .arg(format!("--file={}", dir.path().join("absent.json").display()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: cannot read configuration file"));
}

#[test]
fn test_invalid_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(dir.path(), "{ nope");
    rollout()
        .arg("--file")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_missing_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(dir.path(), r#"{"name":"api","port":4000}"#);
    rollout()
        .arg("--file")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing required field 'version'"));
}

#[test]
fn test_invalid_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(dir.path(), r#"{"name":"api","version":"latest","port":4000}"#);
    rollout()
        .arg("--file")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid version 'latest'"));
}

#[test]
fn test_missing_remote_key_is_reported_before_connecting() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("build")).expect("mkdir");
    let path = write_config(
        dir.path(),
        r#"{
            "name": "api", "version": "1.0.0", "port": 4000,
            "remote": {"host": "203.0.113.9", "user": "deploy", "path": "/srv/apps",
                       "privateKeyPath": "keys/missing_ed25519"}
        }"#,
    );
    rollout()
        .arg("--file")
        .arg(&path)
        .arg("--quiet")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SSH credential"))
        .stderr(predicate::str::contains("missing_ed25519"));
}
