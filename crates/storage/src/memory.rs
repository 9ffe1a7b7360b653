//! In-memory blob store
//!
//! Keeps blobs in a map for the lifetime of the store. Every write is
//! counted, which lets tests observe how often a collection actually
//! persisted without relying on timing.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::store::BlobStore;

/// Process-local blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    writes: Mutex<HashMap<String, u64>>,
    total_writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes made to `key` since creation.
    pub fn write_count(&self, key: &str) -> u64 {
        self.writes.lock().get(key).copied().unwrap_or(0)
    }

    /// Number of writes across all keys.
    pub fn total_writes(&self) -> u64 {
        self.total_writes.load(Ordering::Acquire)
    }

    /// Overwrite a blob without counting it as a write.
    ///
    /// Used to plant corrupted or foreign data in tests.
    pub fn insert_raw(&self, key: &str, data: Vec<u8>) {
        self.blobs.lock().insert(key.to_string(), data);
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn write(&self, key: &str, data: &[u8]) -> io::Result<()> {
        self.blobs.lock().insert(key.to_string(), data.to_vec());
        *self.writes.lock().entry(key.to_string()).or_insert(0) += 1;
        self.total_writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
