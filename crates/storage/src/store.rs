//! Blob store trait
//!
//! A blob store maps a key (the collection name) to one opaque byte blob.
//! Writes replace the whole blob; there is no append or partial update.
//! Where the bytes live is up to the implementation.

use std::io;

/// Name-addressed storage for persisted collections.
///
/// # Thread Safety
///
/// Stores are shared between every collection's persistence worker, so
/// implementations must be `Send + Sync`. A single key is only ever written by
/// one worker at a time; different keys may be written concurrently.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`.
    ///
    /// After a successful return a subsequent `read` observes either this
    /// blob or a later one, never a partial write.
    fn write(&self, key: &str, data: &[u8]) -> io::Result<()>;

    /// Short description used in log output.
    fn describe(&self) -> String;
}
