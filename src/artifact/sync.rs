//! Rule artifact synchronization.
//!
//! # Responsibilities
//! - Read the shared rule file (missing file = empty)
//! - Replace the owned block with one generated from the current `PathConfig`
//! - Strip the block on teardown
//!
//! # Concurrency
//! Each call is a full read-strip-append-write. The final write goes to a
//! temporary sibling and is renamed over the target, so readers never see a
//! half-written file. There is no lock across processes: two saves that
//! overlap can lose one update (last writer wins). Saves are rare and
//! administrator-only, and the next save regenerates the whole block, so a
//! lost update heals itself. Callers in one process serialize through
//! [`MaskControl`](crate::masking::MaskControl).

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::artifact::block::{render_block, splice_block, strip_block};
use crate::masking::paths::{InternalLayout, PathConfig};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read rule artifact {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write rule artifact {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid marker: {0}")]
    Marker(#[from] regex::Error),
}

/// Outcome of one sync or teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub path: PathBuf,
    /// Whether a block is present after the write.
    pub block_written: bool,
    /// Whether the file content changed.
    pub changed: bool,
    pub bytes: usize,
}

/// A rule file partly owned by this engine through a marker pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleArtifact {
    path: PathBuf,
    marker: String,
}

impl RuleArtifact {
    pub fn new(path: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            marker: marker.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Block that `sync` would write for `paths`.
    pub fn preview(&self, paths: &PathConfig, layout: &InternalLayout) -> Option<String> {
        render_block(paths, layout, &self.marker)
    }

    /// Regenerate the owned block from `paths`.
    pub fn sync(&self, paths: &PathConfig, layout: &InternalLayout) -> Result<SyncReport, ArtifactError> {
        let current = self.read()?;
        let next = splice_block(&current, paths, layout, &self.marker)?;
        let block_written = render_block(paths, layout, &self.marker).is_some();
        self.commit(&current, next, block_written)
    }

    /// Remove the owned block, leaving everything else as it was.
    pub fn teardown(&self) -> Result<SyncReport, ArtifactError> {
        let current = self.read()?;
        let next = strip_block(&current, &self.marker)?.into_owned();
        self.commit(&current, next, false)
    }

    /// [`sync`](Self::sync), logging instead of failing. Masking keeps working
    /// from in-memory config when the file cannot be written.
    pub fn sync_or_warn(&self, paths: &PathConfig, layout: &InternalLayout) -> Option<SyncReport> {
        match self.sync(paths, layout) {
            Ok(report) => {
                metrics::record_artifact_sync("ok");
                tracing::info!(
                    path = %report.path.display(),
                    changed = report.changed,
                    block = report.block_written,
                    "Rule artifact synced"
                );
                Some(report)
            }
            Err(e) => {
                metrics::record_artifact_sync("error");
                tracing::warn!(error = %e, "Rule artifact sync failed; continuing with in-memory routing");
                None
            }
        }
    }

    /// [`teardown`](Self::teardown), logging instead of failing.
    pub fn teardown_or_warn(&self) -> Option<SyncReport> {
        match self.teardown() {
            Ok(report) => {
                tracing::info!(path = %report.path.display(), changed = report.changed, "Rule artifact block removed");
                Some(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rule artifact teardown failed");
                None
            }
        }
    }

    fn read(&self) -> Result<String, ArtifactError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(ArtifactError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn commit(&self, current: &str, next: String, block_written: bool) -> Result<SyncReport, ArtifactError> {
        let changed = current != next;
        if changed {
            write_replacing(&self.path, &next).map_err(|source| ArtifactError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(SyncReport {
            path: self.path.clone(),
            block_written,
            changed,
            bytes: next.len(),
        })
    }
}

/// Write to a temporary sibling, then rename over `path`.
fn write_replacing(path: &Path, contents: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"))?;
    let tmp = path.with_file_name(format!(
        ".{}.{}.mask-tmp",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));

    fs::write(&tmp, contents)?;
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::block::DEFAULT_MARKER;
    use crate::masking::paths::{RawPaths, SanitizePolicy};

    fn paths(uploads: &str) -> PathConfig {
        PathConfig::sanitize(
            &RawPaths {
                content: Some("assets".into()),
                includes: Some("core".into()),
                uploads: Some(uploads.into()),
                comments: Some("submit".into()),
            },
            SanitizePolicy::default(),
        )
    }

    #[test]
    fn missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = RuleArtifact::new(dir.path().join(".htaccess"), DEFAULT_MARKER);
        let report = artifact.sync(&paths("media"), &InternalLayout::default()).unwrap();
        assert!(report.changed && report.block_written);
        let written = fs::read_to_string(artifact.path()).unwrap();
        assert!(written.starts_with("# BEGIN PATH_MASK\n"));
        assert!(written.contains("RewriteRule ^media\\/(.*)$ wp-content/uploads/$1 [L]"));
    }

    #[test]
    fn second_sync_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".htaccess");
        fs::write(&path, "# BEGIN WordPress\nRewriteEngine On\n# END WordPress\n").unwrap();
        let artifact = RuleArtifact::new(&path, DEFAULT_MARKER);

        artifact.sync(&paths("media"), &InternalLayout::default()).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        let report = artifact.sync(&paths("media"), &InternalLayout::default()).unwrap();
        assert!(!report.changed);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn changed_config_replaces_block() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = RuleArtifact::new(dir.path().join(".htaccess"), DEFAULT_MARKER);
        artifact.sync(&paths("media"), &InternalLayout::default()).unwrap();
        artifact.sync(&paths("files"), &InternalLayout::default()).unwrap();

        let written = fs::read_to_string(artifact.path()).unwrap();
        assert_eq!(written.matches("# BEGIN PATH_MASK").count(), 1);
        assert!(written.contains("^files\\/"));
        assert!(!written.contains("^media\\/"));
    }

    #[test]
    fn teardown_restores_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".htaccess");
        let original = "Options -Indexes\n# BEGIN WordPress\nRewriteEngine On\n# END WordPress\n";
        fs::write(&path, original).unwrap();
        let artifact = RuleArtifact::new(&path, DEFAULT_MARKER);

        artifact.sync(&paths("media"), &InternalLayout::default()).unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), original);

        let report = artifact.teardown().unwrap();
        assert!(report.changed && !report.block_written);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn unwritable_location_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = RuleArtifact::new(dir.path().join("missing-dir").join(".htaccess"), DEFAULT_MARKER);
        assert!(matches!(
            artifact.sync(&paths("media"), &InternalLayout::default()),
            Err(ArtifactError::Write { .. })
        ));
        assert!(artifact.sync_or_warn(&paths("media"), &InternalLayout::default()).is_none());
    }
}
