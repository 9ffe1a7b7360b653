//! Stash - embedded vector document store with transparent persistence
//!
//! Collections hold documents (an id, an embedding, and whatever else the
//! document type carries) in memory, answer cosine-similarity searches by
//! linear scan, and save themselves to disk in the background after writes
//! settle.
//!
//! # Quick Start
//!
//! ```no_run
//! use stashdb::{Registry, StashConfig, TextDocument};
//!
//! # fn main() -> stashdb::Result<()> {
//! let registry = Registry::open(StashConfig::with_data_dir("./stash-data"))?;
//! let notes = registry.collection("notes")?;
//!
//! notes.add_document(TextDocument::new("hello", vec![1.0, 0.0]), false);
//! let hits = notes.search(&[1.0, 0.1], 5, Some(0.5));
//! assert_eq!(hits[0].document.text(), "hello");
//!
//! // Force the write instead of waiting for the debounce delay
//! notes.save_now()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `stash-core`: `Document` trait, `TextDocument`, similarity, errors
//! - `stash-storage`: blob stores, codecs, and the on-disk envelope
//! - `stash-engine`: collections, registry, configuration

pub use stash_core::*;
pub use stash_engine::{
    validate_collection_name, Collection, ManagedCollection, PersistStats, Registry, StashConfig,
    CONFIG_FILE_NAME, DEFAULT_DATA_DIR, ENV_DATA_DIR, ENV_SAVE_DELAY_MS, MAX_COLLECTION_NAME_LEN,
};
pub use stash_storage::{
    get_codec, BlobStore, CodecError, FileStore, IdentityCodec, MemoryStore, StorageCodec,
    ZstdCodec, DEFAULT_COMPRESSION_LEVEL,
};
