//! Zstandard compression codec.
//!
//! Default codec for persisted collections. Embeddings are float arrays with
//! little redundancy, but field names and text payloads compress well.

use super::traits::{CodecError, StorageCodec};

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Zstd codec with a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// Create a codec with the given compression level (1..=22).
    pub fn new(level: i32) -> Self {
        ZstdCodec { level }
    }

    /// Compression level in use
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl StorageCodec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, self.level)
            .map_err(|e| CodecError::encode(format!("zstd encoder: {}", e), self.codec_id()))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(data).map_err(|e| {
            CodecError::decode(format!("zstd decoder: {}", e), self.codec_id(), data.len())
        })
    }

    fn codec_id(&self) -> &str {
        "zstd"
    }
}
