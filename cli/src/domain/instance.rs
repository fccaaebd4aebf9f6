//! Sibling instances as reported by the Docker host, and the pure decisions
//! taken over them: version guard and retention.

use chrono::{DateTime, Utc};
use semver::Version;

use crate::domain::error::VersionGuardError;
use crate::domain::identity::{InstanceIdentity, parse_sibling_name, volume_for_container};

/// `docker ps --format` template matching [`parse_listing`].
pub const LISTING_FORMAT: &str = "{{.Names}}|{{.CreatedAt}}|{{.State}}";

/// One container sharing the deployment's base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub volume: String,
    pub version: Version,
    /// Archive timestamp, for archived instances.
    pub archived_at: Option<String>,
    pub created_at: DateTime<Utc>,
    pub running: bool,
}

/// Parse `docker ps -a --format LISTING_FORMAT` output into siblings of
/// `base_name`. Rows that do not belong to the base name are dropped.
/// An unreadable creation time sorts as the oldest possible.
#[must_use]
pub fn parse_listing(base_name: &str, stdout: &str) -> Vec<Instance> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(3, '|');
            let name = fields.next()?.trim();
            let created = fields.next().unwrap_or_default();
            let state = fields.next().unwrap_or_default();
            let sibling = parse_sibling_name(base_name, name)?;
            Some(Instance {
                name: name.to_string(),
                volume: volume_for_container(base_name, name)?,
                version: sibling.version,
                archived_at: sibling.archived_at,
                created_at: parse_created_at(created).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                running: state.trim().eq_ignore_ascii_case("running"),
            })
        })
        .collect()
}

/// Parse Docker's `CreatedAt` column, e.g. `2026-10-19 08:05:03 +0000 UTC`.
///
/// The trailing zone abbreviation is ignored; the numeric offset is used.
#[must_use]
pub fn parse_created_at(text: &str) -> Option<DateTime<Utc>> {
    let head: Vec<&str> = text.split_whitespace().take(3).collect();
    if head.len() < 3 {
        return None;
    }
    DateTime::parse_from_str(&head.join(" "), "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Newest version among `instances`, or `0.0.0` when there are none.
#[must_use]
pub fn latest_version(instances: &[Instance]) -> Version {
    instances
        .iter()
        .map(|i| &i.version)
        .max()
        .cloned()
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

/// Production rule: versions are append-only.
///
/// # Errors
///
/// `AlreadyDeployed` when any sibling (live or archived) carries the requested
/// version, `NotMonotonic` when the requested version is not strictly newer
/// than every sibling.
pub fn check_monotonic(
    identity: &InstanceIdentity,
    instances: &[Instance],
) -> Result<(), VersionGuardError> {
    let requested = identity.version();
    if instances.iter().any(|i| &i.version == requested) {
        return Err(VersionGuardError::AlreadyDeployed {
            name: identity.base_name().to_string(),
            version: requested.to_string(),
        });
    }
    let latest = latest_version(instances);
    if *requested <= latest {
        return Err(VersionGuardError::NotMonotonic {
            name: identity.base_name().to_string(),
            requested: requested.to_string(),
            latest: latest.to_string(),
        });
    }
    Ok(())
}

/// Instances outside the retention window, oldest last.
///
/// `current` is never selected. The rest are ordered newest first (ties by
/// name, descending) and everything after the first `keep` is returned.
#[must_use]
pub fn select_for_pruning(instances: &[Instance], current: &str, keep: usize) -> Vec<Instance> {
    let mut candidates: Vec<&Instance> = instances.iter().filter(|i| i.name != current).collect();
    candidates.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.name.cmp(&a.name))
    });
    candidates.into_iter().skip(keep).cloned().collect()
}
