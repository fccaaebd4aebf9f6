//! Instance naming: containers, volumes and their archived counterparts.
//!
//! Every name the orchestrator touches on the Docker host is derived here.
//! The functions are total and deterministic, which is what makes a redeploy
//! of the same version detectable.

use chrono::{DateTime, Utc};
use semver::Version;

use crate::domain::error::ConfigError;

/// Separates a live instance name from the archive timestamp.
pub const ARCHIVE_MARKER: &str = "-archived-";

/// UTC timestamp format appended to archived names.
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Infix between the base name and the version in volume names.
const VOLUME_INFIX: &str = "-data-";

/// `(base name, version)` — the identity of one deployed instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentity {
    base_name: String,
    version: Version,
}

impl InstanceIdentity {
    #[must_use]
    pub fn new(base_name: impl Into<String>, version: Version) -> Self {
        Self {
            base_name: base_name.into(),
            version,
        }
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `baseName-version`
    #[must_use]
    pub fn container_name(&self) -> String {
        format!("{}-{}", self.base_name, self.version)
    }

    /// `baseName-data-version`
    #[must_use]
    pub fn volume_name(&self) -> String {
        format!("{}{VOLUME_INFIX}{}", self.base_name, self.version)
    }

    /// Name the current container is renamed to when archived at `at`.
    #[must_use]
    pub fn archive_name(&self, at: DateTime<Utc>) -> String {
        format!("{}{ARCHIVE_MARKER}{}", self.container_name(), stamp(at))
    }

    /// Backup volume holding a copy of the data volume archived at `at`.
    #[must_use]
    pub fn archive_volume_name(&self, at: DateTime<Utc>) -> String {
        format!("{}{ARCHIVE_MARKER}{}", self.volume_name(), stamp(at))
    }

    /// Filter text that matches every sibling container on the Docker host.
    ///
    /// Docker's name filter is a substring match, so results still have to go
    /// through [`parse_sibling_name`].
    #[must_use]
    pub fn sibling_filter(&self) -> String {
        format!("{}-", self.base_name)
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    at.format(ARCHIVE_STAMP_FORMAT).to_string()
}

/// A container name recognised as belonging to a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingName {
    pub version: Version,
    /// Archive timestamp, for archived instances.
    pub archived_at: Option<String>,
}

/// Parse `baseName-<semver>` or `baseName-<semver>-archived-<stamp>`.
///
/// Returns `None` for anything else, including containers of another service
/// whose name merely starts with the same prefix (`api-worker-1.0.0`).
#[must_use]
pub fn parse_sibling_name(base_name: &str, container_name: &str) -> Option<SiblingName> {
    let rest = container_name
        .strip_prefix(base_name)?
        .strip_prefix('-')?;
    let (version_text, archived_at) = match rest.rsplit_once(ARCHIVE_MARKER) {
        Some((v, s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            (v, Some(s.to_string()))
        }
        _ => (rest, None),
    };
    let version = Version::parse(version_text).ok()?;
    Some(SiblingName {
        version,
        archived_at,
    })
}

/// Volume backing a sibling container, live or archived.
///
/// `api-1.2.0` maps to `api-data-1.2.0`, and
/// `api-1.2.0-archived-20260101000000` to `api-data-1.2.0-archived-20260101000000`.
#[must_use]
pub fn volume_for_container(base_name: &str, container_name: &str) -> Option<String> {
    let rest = container_name
        .strip_prefix(base_name)?
        .strip_prefix('-')?;
    Some(format!("{base_name}{VOLUME_INFIX}{rest}"))
}

/// Validate a base name for use in container and volume names.
///
/// # Errors
///
/// Returns `ConfigError::InvalidName` unless the name matches
/// `^[a-zA-Z0-9][a-zA-Z0-9_.-]*$`.
pub fn validate_base_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(ConfigError::InvalidName(name.to_string()))
    }
}
