//! Filesystem persistence for per-user metadata documents and the run log.
//!
//! The [`MetadataStore`] trait is the key-value view the merge step works
//! against; [`FsMetadataStore`] keeps one pretty-printed `{user_id}.json`
//! document per user in a directory. Writes go through a temp file and a
//! rename, so readers never observe a half-written document.
//!
//! There is no locking: a single writer is assumed.

use std::path::{Path, PathBuf};

use contribsync_shared::{
    Metadata, Result, RunLog, SyncError, metadata_filename, validate_user_id,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

// ---------------------------------------------------------------------------
// MetadataStore
// ---------------------------------------------------------------------------

/// Document store keyed by `{user_id}.json`.
pub trait MetadataStore {
    /// Whether a document exists for `user_id`.
    fn exists(&self, user_id: &str) -> Result<bool>;

    /// Read and decode the document for `user_id`.
    fn read(&self, user_id: &str) -> Result<Metadata>;

    /// Replace the document for `metadata.user_id`.
    fn write(&self, metadata: &Metadata) -> Result<()>;

    /// Read the document for `user_id` if there is one.
    fn load(&self, user_id: &str) -> Result<Option<Metadata>> {
        if self.exists(user_id)? {
            self.read(user_id).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Directory of `{user_id}.json` files.
#[derive(Debug, Clone)]
pub struct FsMetadataStore {
    root: PathBuf,
}

impl FsMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `user_id`. Ids that would resolve outside
    /// the root are rejected.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.root.join(metadata_filename(user_id)))
    }
}

impl MetadataStore for FsMetadataStore {
    fn exists(&self, user_id: &str) -> Result<bool> {
        let path = self.path_for(user_id)?;
        path.try_exists().map_err(|e| SyncError::io(&path, e))
    }

    fn read(&self, user_id: &str) -> Result<Metadata> {
        let path = self.path_for(user_id)?;
        let mut metadata: Metadata = read_json(&path)?;
        metadata.user_id = user_id.to_string();
        Ok(metadata)
    }

    fn write(&self, metadata: &Metadata) -> Result<()> {
        let path = self.path_for(&metadata.user_id)?;
        write_json_atomic(&path, metadata)?;
        debug!(path = %path.display(), contributions = metadata.contributions().len(), "metadata written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

/// JSON file holding the [`RunLog`] of the last successful sync.
#[derive(Debug, Clone)]
pub struct RunLogFile {
    path: PathBuf,
}

impl RunLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the run log. `Ok(None)` if no run has been recorded yet.
    pub fn load(&self) -> Result<Option<RunLog>> {
        if !self.path.try_exists().map_err(|e| SyncError::io(&self.path, e))? {
            return Ok(None);
        }
        read_json(&self.path).map(Some)
    }

    pub fn save(&self, log: &RunLog) -> Result<()> {
        write_json_atomic(&self.path, log)?;
        debug!(path = %self.path.display(), last_execution_time = %log.last_execution_time, "run log saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::parse(format!("invalid JSON in {}: {e}", path.display())))
}

/// Serialize `value` next to `path` and rename it into place.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;

    let mut content = serde_json::to_string_pretty(value)
        .map_err(|e| SyncError::Storage(format!("serializing {}: {e}", path.display())))?;
    content.push('\n');

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::now_v7()));

    std::fs::write(&temp_path, content).map_err(|e| SyncError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        SyncError::io(path, e)
    })
}
