//! Packs a build directory into a gzip-compressed tarball for upload.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::NamedTempFile;

/// Pack the contents of `dir` (not the directory itself) into a temporary
/// `.tar.gz`. The file is deleted when the returned handle is dropped.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or the archive cannot
/// be written.
pub fn pack_dir(dir: &Path) -> Result<NamedTempFile> {
    let archive = tempfile::Builder::new()
        .prefix("rollout-build-")
        .suffix(".tar.gz")
        .tempfile()
        .context("creating temporary archive")?;
    let file: File = archive
        .reopen()
        .context("opening temporary archive for writing")?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(".", dir)
        .with_context(|| format!("archiving {}", dir.display()))?;
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .with_context(|| format!("finishing archive of {}", dir.display()))?;

    tracing::debug!(dir = %dir.display(), archive = %archive.path().display(), "packed build directory");
    Ok(archive)
}
