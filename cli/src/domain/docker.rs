//! Docker command lines issued by the orchestrator.
//!
//! Every function returns a complete shell command for an `ExecutionBackend`.
//! Arguments go through `shell::quote`, so names and paths never need
//! escaping at the call site.

use crate::domain::config::{DeployKind, DeploymentConfig};
use crate::domain::identity::InstanceIdentity;
use crate::domain::instance::LISTING_FORMAT;
use crate::domain::shell;

/// Throwaway image used to inspect and copy volume contents.
pub const HELPER_IMAGE: &str = "alpine";

/// Label key marking resources created by this tool.
pub const MANAGED_LABEL: &str = "rollout.managed=true";

/// Label added to containers recreated as archives.
pub const ARCHIVED_LABEL: &str = "rollout.archived=true";

/// `docker version`, reporting only the daemon version.
#[must_use]
pub fn server_version() -> String {
    shell::join(&["docker", "version", "--format", "{{.Server.Version}}"])
}

/// Every container whose name contains `baseName-`, running or not.
#[must_use]
pub fn list_siblings(identity: &InstanceIdentity) -> String {
    let filter = format!("name={}", identity.sibling_filter());
    shell::join(&["docker", "ps", "-a", "--filter", &filter, "--format", LISTING_FORMAT])
}

#[must_use]
pub fn stop_container(name: &str) -> String {
    shell::join(&["docker", "stop", name])
}

/// Stop and remove in one step. Exits non-zero if the container is absent.
#[must_use]
pub fn remove_container(name: &str) -> String {
    shell::join(&["docker", "rm", "-f", name])
}

#[must_use]
pub fn inspect_volume(volume: &str) -> String {
    shell::join(&["docker", "volume", "inspect", volume])
}

#[must_use]
pub fn create_volume(volume: &str) -> String {
    shell::join(&["docker", "volume", "create", "--label", MANAGED_LABEL, volume])
}

#[must_use]
pub fn remove_volume(volume: &str) -> String {
    shell::join(&["docker", "volume", "rm", volume])
}

#[must_use]
pub fn inspect_network(network: &str) -> String {
    shell::join(&["docker", "network", "inspect", network])
}

#[must_use]
pub fn create_network(network: &str) -> String {
    shell::join(&["docker", "network", "create", network])
}

/// Copy the full contents of volume `from` into volume `to`.
#[must_use]
pub fn copy_volume(from: &str, to: &str) -> String {
    let src = format!("{from}:/from:ro");
    let dst = format!("{to}:/to");
    shell::join(&[
        "docker", "run", "--rm", "-v", &src, "-v", &dst, HELPER_IMAGE, "sh", "-c",
        "cp -a /from/. /to/",
    ])
}

/// Exits zero when `entrypoint` exists at the root of `volume`.
#[must_use]
pub fn probe_entrypoint(volume: &str, entrypoint: &str) -> String {
    let mount = format!("{volume}:/probe:ro");
    let target = format!("/probe/{}", entrypoint.trim_start_matches('/'));
    shell::join(&[
        "docker", "run", "--rm", "-v", &mount, HELPER_IMAGE, "test", "-e", &target,
    ])
}

/// Copy a staged directory on the target host into `volume`.
#[must_use]
pub fn sync_into_volume(staged_dir: &str, volume: &str) -> String {
    let src = format!("{staged_dir}:/src:ro");
    let dst = format!("{volume}:/dst");
    shell::join(&[
        "docker", "run", "--rm", "-v", &src, "-v", &dst, HELPER_IMAGE, "sh", "-c",
        "cp -a /src/. /dst/",
    ])
}

/// Default startup for a dynamic service: install dependencies once, then
/// exec the entrypoint.
#[must_use]
pub fn startup_command(entrypoint: &str) -> String {
    format!(
        "if [ ! -d node_modules ]; then npm install --omit=dev; fi; exec node {}",
        shell::quote(entrypoint)
    )
}

/// Full `docker run` for the deployment, detached.
///
/// `env_file` is the path of the materialized env file on the target host,
/// when the environment is non-empty.
#[must_use]
pub fn run_container(config: &DeploymentConfig, env_file: Option<&str>) -> String {
    let identity = &config.identity;
    let mut args: Vec<String> = vec!["docker".into(), "run".into(), "-d".into()];
    args.extend(container_args(
        config,
        &identity.container_name(),
        &identity.volume_name(),
        env_file,
        &[],
    ));
    shell::join(&args)
}

/// `docker create` of a stopped archive container with the deployment's
/// options and `volume` mounted in place of the live data volume.
#[must_use]
pub fn create_archive(
    config: &DeploymentConfig,
    name: &str,
    volume: &str,
    env_file: Option<&str>,
) -> String {
    let mut args: Vec<String> = vec!["docker".into(), "create".into()];
    args.extend(container_args(config, name, volume, env_file, &[ARCHIVED_LABEL]));
    shell::join(&args)
}

/// Everything after `docker run -d` / `docker create`: name, port, mount,
/// runtime options, image and startup command.
fn container_args(
    config: &DeploymentConfig,
    name: &str,
    volume: &str,
    env_file: Option<&str>,
    extra_labels: &[&str],
) -> Vec<String> {
    let identity = &config.identity;
    let kind = config.kind;
    let mount_point = kind.mount_point();
    let mount = match kind {
        DeployKind::DynamicService => format!("{volume}:{mount_point}"),
        DeployKind::StaticAssets => format!("{volume}:{mount_point}:ro"),
    };

    let mut args: Vec<String> = vec![
        "--name".into(),
        name.into(),
        "-p".into(),
        format!("{}:{}", config.port, kind.container_port()),
        "-v".into(),
        mount,
        "-w".into(),
        mount_point.into(),
    ];

    let opts = &config.docker;
    let mut flag = |name: &str, value: &Option<String>| {
        if let Some(v) = value {
            args.push(name.into());
            args.push(v.clone());
        }
    };
    flag("--cpus", &opts.cpus);
    flag("--memory", &opts.memory);
    flag("--restart", &opts.restart);
    flag("--hostname", &opts.hostname);
    flag("--user", &opts.user);

    for network in &opts.networks {
        args.extend(["--network".into(), network.clone()]);
    }
    for host in &opts.add_host {
        args.extend(["--add-host".into(), host.clone()]);
    }
    for label in &opts.labels {
        args.extend(["--label".into(), label.clone()]);
    }
    args.extend([
        "--label".into(),
        MANAGED_LABEL.into(),
        "--label".into(),
        format!("rollout.version={}", identity.version()),
    ]);
    for label in extra_labels {
        args.extend(["--label".into(), (*label).to_string()]);
    }

    if let Some(path) = env_file {
        args.extend(["--env-file".into(), path.to_string()]);
    }

    args.push(config.image.clone());

    let command = match (&config.command, kind) {
        (Some(custom), _) => Some(custom.clone()),
        (None, DeployKind::DynamicService) => Some(startup_command(&config.entrypoint)),
        (None, DeployKind::StaticAssets) => None,
    };
    if let Some(cmd) = command {
        args.extend(["sh".into(), "-c".into(), cmd]);
    }
    args
}
