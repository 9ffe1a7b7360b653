//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
pub use stashdb::{
    BlobStore, Collection, Document, Error, FileStore, IdentityCodec, LoadError, MemoryStore,
    Registry, SearchResult, StashConfig, StorageCodec, TextDocument, Uuid, ZstdCodec,
    DEFAULT_NUM_RESULTS,
};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

/// Debounce delay used by most tests.
pub const TEST_SAVE_DELAY_MS: u64 = 100;

/// Long enough for a `TEST_SAVE_DELAY_MS` timer to fire on a loaded machine.
pub const SETTLE: Duration = Duration::from_millis(600);

/// Registry over a `MemoryStore`, for counting writes.
pub struct MemoryStash {
    pub registry: Registry,
    pub store: Arc<MemoryStore>,
}

impl MemoryStash {
    pub fn new() -> Self {
        Self::with_delay(TEST_SAVE_DELAY_MS)
    }

    pub fn with_delay(save_delay_ms: u64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = StashConfig {
            save_delay_ms,
            ..StashConfig::default()
        };
        let registry = Registry::with_store(
            store.clone() as Arc<dyn BlobStore>,
            Arc::new(ZstdCodec::default()),
            config,
        );
        MemoryStash { registry, store }
    }

    pub fn writes(&self, name: &str) -> u64 {
        self.store.write_count(name)
    }
}

/// Registry over a temporary directory.
pub struct DiskStash {
    pub registry: Registry,
    pub dir: TempDir,
}

impl DiskStash {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let registry = Self::open_registry(dir.path());
        DiskStash { registry, dir }
    }

    /// A second registry over the same directory, as after a restart.
    pub fn reopen(&self) -> Registry {
        Self::open_registry(self.dir.path())
    }

    pub fn blob_path(&self, name: &str) -> PathBuf {
        FileStore::new(self.dir.path()).path_for(name)
    }

    fn open_registry(path: &Path) -> Registry {
        let config = StashConfig {
            save_delay_ms: TEST_SAVE_DELAY_MS,
            ..StashConfig::with_data_dir(path)
        };
        Registry::open(config).expect("Failed to open registry")
    }
}

// ============================================================================
// Documents
// ============================================================================

pub fn text_doc(text: &str, embedding: &[f32]) -> TextDocument {
    TextDocument::new(text, embedding.to_vec())
}

/// Ids of a result list, in rank order.
pub fn ids<D: Document>(results: &[SearchResult<D>]) -> Vec<Uuid> {
    results.iter().map(|r| r.id).collect()
}

/// Sorted ids of every document in a collection.
pub fn sorted_ids<D: Document>(collection: &Collection<D>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = collection
        .get_all_documents()
        .iter()
        .map(|d| d.id())
        .collect();
    ids.sort();
    ids
}
