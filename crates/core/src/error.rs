//! Error types for Stash
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Structural errors (name uniqueness, load failures) are returned
//! synchronously. Failures of the debounced persistence path never reach the
//! caller of a mutation; they are logged by the engine instead.

use std::io;
use thiserror::Error;

/// Result type alias for Stash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stash
#[derive(Debug, Error)]
pub enum Error {
    /// A collection with this name is already registered
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    /// A stored blob exists but could not be turned back into documents
    #[error("Failed to load collection '{collection}': {source}")]
    Load {
        /// Collection being loaded
        collection: String,
        /// What went wrong
        #[source]
        source: LoadError,
    },

    /// A save requested through `save_now` failed
    #[error("Failed to persist collection '{collection}': {reason}")]
    Persist {
        /// Collection being saved
        collection: String,
        /// Failure description
        reason: String,
    },

    /// Vectors of different lengths were compared in strict mode
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Length of the query vector
        expected: usize,
        /// Length of the offending vector
        actual: usize,
    },

    /// Collection name cannot be used as a storage key
    #[error("Invalid collection name '{name}': {reason}")]
    InvalidCollectionName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The collection was released and no longer persists
    #[error("Collection is closed: {0}")]
    CollectionClosed(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The process-wide registry was already initialized
    #[error("Global registry is already initialized")]
    AlreadyInitialized,

    /// I/O error outside of the load path
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap a load failure with the collection it belongs to.
    pub fn load(collection: impl Into<String>, source: LoadError) -> Self {
        Error::Load {
            collection: collection.into(),
            source,
        }
    }

    /// Build a persistence failure.
    pub fn persist(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Persist {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid-name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidCollectionName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a load failure.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Error::Load { .. })
    }
}

/// Reasons a stored collection blob could not be loaded.
///
/// When any of these is returned the in-memory collection keeps the state it
/// had before the load was attempted.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Envelope header is malformed (magic, version, codec id or checksum)
    #[error("Invalid envelope: {0}")]
    Envelope(String),

    /// The codec could not decode the payload
    #[error("Decode error (codec={codec_id}): {detail}")]
    Decode {
        /// Codec that attempted the decode
        codec_id: String,
        /// Failure description
        detail: String,
    },

    /// Payload decoded but is not a valid document map
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// A map key does not match the id of the document stored under it
    #[error("Key '{key}' does not match document id {id}")]
    CorruptKey {
        /// Key found in the stored map
        key: String,
        /// Id carried by the document
        id: String,
    },

    /// Reading the blob failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
