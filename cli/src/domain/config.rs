//! Deployment document schema and resolution into an immutable config.
//!
//! Pure functions only — no I/O, no async, no filesystem access. Loading the
//! JSON file from disk lives in `crate::infra::config`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::identity::{InstanceIdentity, validate_base_name};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_KEEP_VERSIONS: usize = 4;
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_PRODUCTION_MARKERS: &[&str] = &["production", "prod"];

// ── Deploy kind ──────────────────────────────────────────────────────────────

/// What is being deployed. Decides the image, container port, mount mode and
/// startup command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployKind {
    /// A long-running Node service started from an entrypoint.
    #[default]
    #[serde(alias = "node")]
    DynamicService,
    /// A static bundle served read-only by nginx.
    #[serde(alias = "static")]
    StaticAssets,
}

impl DeployKind {
    /// Port the workload listens on inside the container.
    #[must_use]
    pub fn container_port(self) -> u16 {
        match self {
            Self::DynamicService => 3000,
            Self::StaticAssets => 80,
        }
    }

    #[must_use]
    pub fn default_image(self) -> &'static str {
        match self {
            Self::DynamicService => "node:lts-slim",
            Self::StaticAssets => "nginx:alpine",
        }
    }

    #[must_use]
    pub fn default_entrypoint(self) -> &'static str {
        match self {
            Self::DynamicService => "index.js",
            Self::StaticAssets => "index.html",
        }
    }

    /// Where the data volume is mounted inside the container.
    #[must_use]
    pub fn mount_point(self) -> &'static str {
        match self {
            Self::DynamicService => "/app",
            Self::StaticAssets => "/usr/share/nginx/html",
        }
    }
}

// ── Raw document ─────────────────────────────────────────────────────────────

/// Container runtime options, passed through to `docker run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DockerOptions {
    pub cpus: Option<String>,
    pub memory: Option<String>,
    pub restart: Option<String>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub networks: Vec<String>,
    pub add_host: Vec<String>,
    pub labels: Vec<String>,
}

/// Remote section as written in the JSON document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub host: Option<String>,
    pub user: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

/// The deployment document exactly as written on disk. Every field is
/// optional here; `resolve` enforces what is mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDocument {
    pub name: Option<String>,
    pub version: Option<String>,
    pub deploy_type: Option<DeployKind>,
    pub port: Option<u16>,
    pub image: Option<String>,
    pub build_dir: Option<PathBuf>,
    pub main: Option<String>,
    pub command: Option<String>,
    #[serde(default)]
    pub docker_options: DockerOptions,
    pub env_file: Option<PathBuf>,
    #[serde(default)]
    pub env: IndexMap<String, serde_json::Value>,
    pub keep_versions: Option<usize>,
    pub production_markers: Option<Vec<String>>,
    pub remote: Option<RemoteDocument>,
}

// ── Resolved config ──────────────────────────────────────────────────────────

/// SSH target for a remote deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub private_key: Option<PathBuf>,
    /// Base directory on the remote host for staging and scratch files.
    pub base_path: String,
}

impl RemoteTarget {
    /// `user@host`, as passed to `ssh` and `scp`.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Part of `base_path` below the login user's home directory, when the
    /// path is not absolute (`~`, `~/apps`, `apps`).
    #[must_use]
    pub fn home_relative_path(&self) -> Option<&str> {
        let path = self.base_path.as_str();
        if path.starts_with('/') {
            return None;
        }
        Some(path.strip_prefix('~').unwrap_or(path).trim_start_matches('/'))
    }
}

/// Immutable, fully-defaulted description of one deployment.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub identity: InstanceIdentity,
    pub kind: DeployKind,
    /// Host port published for the container port.
    pub port: u16,
    pub image: String,
    pub build_dir: PathBuf,
    /// Entrypoint file relative to the build directory.
    pub entrypoint: String,
    /// Replaces the generated startup command verbatim.
    pub command: Option<String>,
    pub docker: DockerOptions,
    pub env_file: Option<PathBuf>,
    pub inline_env: Vec<(String, String)>,
    pub keep_versions: usize,
    pub production_markers: Vec<String>,
    /// Directory holding the deployment document and the root `package.json`.
    pub project_root: PathBuf,
    pub remote: Option<RemoteTarget>,
}

impl DeploymentConfig {
    /// Human label of the target host.
    #[must_use]
    pub fn target_label(&self) -> &str {
        self.remote.as_ref().map_or("localhost", |r| r.host.as_str())
    }
}

/// Resolve a raw document into a `DeploymentConfig`.
///
/// Relative paths are anchored at `project_root`.
///
/// # Errors
///
/// Returns `ConfigError` when a mandatory field is missing or invalid.
pub fn resolve(
    doc: DeploymentDocument,
    project_root: &Path,
) -> Result<DeploymentConfig, ConfigError> {
    let name = doc.name.ok_or(ConfigError::MissingField("name"))?;
    validate_base_name(&name)?;

    let raw_version = doc.version.ok_or(ConfigError::MissingField("version"))?;
    let version = parse_version(&raw_version)?;

    let port = doc.port.ok_or(ConfigError::MissingField("port"))?;
    let kind = doc.deploy_type.unwrap_or_default();

    let build_dir = anchor(
        project_root,
        doc.build_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR)),
    );
    let env_file = doc.env_file.map(|p| anchor(project_root, p));

    let inline_env = doc
        .env
        .into_iter()
        .map(|(k, v)| (k, env_value_text(&v)))
        .collect();

    let production_markers = doc.production_markers.unwrap_or_else(|| {
        DEFAULT_PRODUCTION_MARKERS
            .iter()
            .map(|m| (*m).to_string())
            .collect()
    });

    let remote = doc
        .remote
        .map(|r| resolve_remote(r, project_root))
        .transpose()?;

    Ok(DeploymentConfig {
        identity: InstanceIdentity::new(name, version),
        kind,
        port,
        image: doc
            .image
            .unwrap_or_else(|| kind.default_image().to_string()),
        build_dir,
        entrypoint: doc
            .main
            .unwrap_or_else(|| kind.default_entrypoint().to_string()),
        command: doc.command.filter(|c| !c.trim().is_empty()),
        docker: doc.docker_options,
        env_file,
        inline_env,
        keep_versions: doc.keep_versions.unwrap_or(DEFAULT_KEEP_VERSIONS),
        production_markers,
        project_root: project_root.to_path_buf(),
        remote,
    })
}

/// Parse a deploy version, tolerating a leading `v`.
///
/// Build metadata is rejected: `+` is not allowed in Docker container or
/// volume names.
///
/// # Errors
///
/// Returns `ConfigError::InvalidVersion` if the text is not semver or
/// carries build metadata.
pub fn parse_version(raw: &str) -> Result<Version, ConfigError> {
    let trimmed = raw.trim();
    let text = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let version = Version::parse(text).map_err(|e| ConfigError::InvalidVersion {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !version.build.is_empty() {
        return Err(ConfigError::InvalidVersion {
            value: raw.to_string(),
            reason: "build metadata ('+...') cannot be used in container names".to_string(),
        });
    }
    Ok(version)
}

fn resolve_remote(doc: RemoteDocument, project_root: &Path) -> Result<RemoteTarget, ConfigError> {
    let host = doc.host.ok_or(ConfigError::MissingField("remote.host"))?;
    let user = doc.user.ok_or(ConfigError::MissingField("remote.user"))?;
    let raw_path = doc.path.ok_or(ConfigError::MissingField("remote.path"))?;
    let raw_path = raw_path.trim();
    // `~user/...` would need the remote user database.
    if raw_path.starts_with('~') && !(raw_path == "~" || raw_path.starts_with("~/")) {
        return Err(ConfigError::InvalidRemotePath(raw_path.to_string()));
    }
    let base_path = match raw_path.trim_end_matches('/') {
        "" if raw_path.starts_with('/') => "/",
        trimmed => trimmed,
    };
    Ok(RemoteTarget {
        host,
        user,
        port: doc.port.unwrap_or(DEFAULT_SSH_PORT),
        private_key: doc.private_key_path.map(|p| anchor(project_root, p)),
        base_path: base_path.to_string(),
    })
}

// `~/...` stays untouched; the home directory is expanded by infra.
fn anchor(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || path.starts_with("~") {
        path
    } else {
        root.join(path)
    }
}

fn env_value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
