//! File-backed blob store
//!
//! One file per key under a root directory: `<root>/<key>.stash`.
//! Writes go to `<key>.stash.tmp`, are fsynced, then renamed over the
//! target so readers never observe a torn blob.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::store::BlobStore;

/// File extension for persisted collections.
pub const BLOB_EXTENSION: &str = "stash";

/// Blob store rooted at a directory.
///
/// The directory is created lazily on first write. Keys are used verbatim as
/// file stems; callers are expected to validate them (the engine rejects
/// names containing path separators).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    /// Path of the blob for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, BLOB_EXTENSION))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}.tmp", key, BLOB_EXTENSION))
    }
}

impl BlobStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;

        // Atomic write: temp + fsync + rename
        let temp_path = self.temp_path_for(key);
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        let path = self.path_for(key);
        fs::rename(&temp_path, &path)?;

        debug!(target: "stash::persist", path = ?path, bytes = data.len(), "Blob written");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.root.display())
    }
}
