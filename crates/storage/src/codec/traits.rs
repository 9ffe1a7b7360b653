//! Storage codec trait definitions.

/// Storage codec trait.
///
/// Every persisted collection payload goes through the codec before it is
/// written and after it is read. This is the compression seam.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` to allow concurrent encoding/decoding
/// from multiple persistence workers.
///
/// # Codec Identity
///
/// Each codec has a unique identifier that is stored in the blob envelope.
/// Loading a blob written by a different codec fails instead of producing
/// garbage.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Returns an error if the data
    /// cannot be decoded (e.g., truncated or corrupted frame).
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier (at most 255 bytes).
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("Encode error (codec={codec_id}): {detail}")]
    EncodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the encode
        codec_id: String,
    },

    /// Decoding failed (e.g., invalid frame).
    ///
    /// Carries the codec identity and data length so callers can
    /// distinguish a wrong-codec error from data corruption.
    #[error("Decode error (codec={codec_id}, data_len={data_len}): {detail}")]
    DecodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the decode
        codec_id: String,
        /// Length of the data that failed to decode
        data_len: usize,
    },

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    /// Blob was written with a different codec.
    #[error("Codec mismatch: expected {expected}, got {actual}")]
    CodecMismatch {
        /// Codec ID recorded in the blob
        expected: String,
        /// Codec ID being used
        actual: String,
    },
}

impl CodecError {
    /// Create an encode error.
    pub fn encode(detail: impl Into<String>, codec_id: impl Into<String>) -> Self {
        CodecError::EncodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
        }
    }

    /// Create a decode error with full diagnostic context.
    pub fn decode(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::DecodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }
}

impl From<CodecError> for stash_core::LoadError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::DecodeError {
                detail, codec_id, ..
            } => stash_core::LoadError::Decode { codec_id, detail },
            other => stash_core::LoadError::Envelope(other.to_string()),
        }
    }
}
