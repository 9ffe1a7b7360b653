//! Storage codec abstraction.
//!
//! All persisted payloads pass through a codec on the way to and from the
//! blob store. The codec id is written into the blob envelope so a collection
//! cannot be silently decoded with the wrong codec.
//!
//! # Usage
//!
//! ```ignore
//! use stash_storage::codec::{get_codec, StorageCodec};
//!
//! let codec = get_codec("zstd", 3)?;
//! let encoded = codec.encode(b"hello world")?;
//! let decoded = codec.decode(&encoded)?;
//! ```

mod identity;
mod traits;
mod zstd_codec;

pub use identity::IdentityCodec;
pub use traits::{CodecError, StorageCodec};
pub use zstd_codec::{ZstdCodec, DEFAULT_COMPRESSION_LEVEL};

/// Get a codec by its identifier.
///
/// `level` only applies to compressing codecs.
///
/// # Known Codecs
///
/// - `"identity"`: No-op codec (pass-through)
/// - `"zstd"`: Zstandard compression
pub fn get_codec(codec_id: &str, level: i32) -> Result<Box<dyn StorageCodec>, CodecError> {
    match codec_id {
        "identity" => Ok(Box::new(IdentityCodec)),
        "zstd" => Ok(Box::new(ZstdCodec::new(level))),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}
