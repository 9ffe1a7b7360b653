//! Storage layer for Stash
//!
//! This crate implements the byte-level persistence seam used by collections:
//! - BlobStore: name-addressed blob storage (whole-blob replace, no append)
//! - FileStore: one file per collection, atomic temp + fsync + rename
//! - MemoryStore: process-local store that counts writes (tests, ephemeral use)
//! - StorageCodec: pluggable byte codec (identity, zstd compression)
//! - format: the envelope wrapped around every persisted payload

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod file;
pub mod format;
pub mod memory;
pub mod store;

pub use codec::{
    get_codec, CodecError, IdentityCodec, StorageCodec, ZstdCodec, DEFAULT_COMPRESSION_LEVEL,
};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::BlobStore;
