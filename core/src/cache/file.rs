//! # File cache
//!
//! One JSON record per fingerprint, named after the fingerprint, under a
//! root directory. Records are written to a temporary file in the same
//! directory and renamed into place, so readers never see a partial record
//! and concurrent writers to one fingerprint resolve as last-writer-wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use super::{CacheEntry, CacheResult, CacheStore};

/// Root used by `FileCache::default()`.
pub const DEFAULT_CACHE_DIR: &str = "cache";

#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// The directory is created on first write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(fingerprint)
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl CacheStore for FileCache {
    fn read(&self, fingerprint: &str) -> CacheResult<Option<CacheEntry>> {
        let path = self.entry_path(fingerprint);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write(&self, fingerprint: &str, entry: &CacheEntry) -> CacheResult<()> {
        fs::create_dir_all(&self.root)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer(&mut tmp, entry)?;

        let path = self.entry_path(fingerprint);
        tmp.persist(&path)?;
        trace!(path = %path.display(), "cache record written");
        Ok(())
    }
}
