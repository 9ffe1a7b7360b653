//! Persisted blob envelope
//!
//! ```text
//! +-------+---------+--------+----------+-------+-----------------+
//! | magic | version | id_len | codec_id | crc32 | encoded payload |
//! | 4B    | u32 LE  | u8     | id_len B | u32LE | ...             |
//! +-------+---------+--------+----------+-------+-----------------+
//! ```
//!
//! The CRC covers the encoded payload. The payload itself is whatever the
//! engine serialized, run through the codec named in the header.

use stash_core::LoadError;

use crate::codec::{CodecError, StorageCodec};

/// Magic bytes at the start of every blob
pub const BLOB_MAGIC: &[u8; 4] = b"STSH";

/// Current envelope version
pub const BLOB_VERSION: u32 = 1;

const FIXED_HEADER_LEN: usize = 4 + 4 + 1;

/// Encode `payload` with `codec` and wrap it in an envelope.
pub fn seal(payload: &[u8], codec: &dyn StorageCodec) -> Result<Vec<u8>, CodecError> {
    let codec_id = codec.codec_id().as_bytes();
    if codec_id.len() > u8::MAX as usize {
        return Err(CodecError::encode(
            "codec id longer than 255 bytes",
            codec.codec_id(),
        ));
    }

    let encoded = codec.encode(payload)?;
    let crc = crc32fast::hash(&encoded);

    let mut buf = Vec::with_capacity(FIXED_HEADER_LEN + codec_id.len() + 4 + encoded.len());
    buf.extend_from_slice(BLOB_MAGIC);
    buf.extend_from_slice(&BLOB_VERSION.to_le_bytes());
    buf.push(codec_id.len() as u8);
    buf.extend_from_slice(codec_id);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&encoded);
    Ok(buf)
}

/// Validate the envelope and decode the payload with `codec`.
///
/// Fails if the header is malformed, the blob was written by a different
/// codec, the checksum does not match, or the codec rejects the payload.
pub fn open(blob: &[u8], codec: &dyn StorageCodec) -> Result<Vec<u8>, LoadError> {
    if blob.len() < FIXED_HEADER_LEN {
        return Err(LoadError::Envelope(format!(
            "blob too small ({} bytes)",
            blob.len()
        )));
    }
    if &blob[0..4] != BLOB_MAGIC {
        return Err(LoadError::Envelope("bad magic".to_string()));
    }

    let version = read_u32(&blob[4..8]);
    if version != BLOB_VERSION {
        return Err(LoadError::Envelope(format!(
            "unsupported version {}",
            version
        )));
    }

    let id_len = blob[8] as usize;
    let crc_start = FIXED_HEADER_LEN + id_len;
    let payload_start = crc_start + 4;
    if blob.len() < payload_start {
        return Err(LoadError::Envelope("truncated header".to_string()));
    }

    let stored_id = String::from_utf8_lossy(&blob[FIXED_HEADER_LEN..crc_start]);
    if stored_id != codec.codec_id() {
        return Err(CodecError::CodecMismatch {
            expected: stored_id.into_owned(),
            actual: codec.codec_id().to_string(),
        }
        .into());
    }

    let stored_crc = read_u32(&blob[crc_start..payload_start]);
    let encoded = &blob[payload_start..];
    let actual_crc = crc32fast::hash(encoded);
    if stored_crc != actual_crc {
        return Err(LoadError::Envelope(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    Ok(codec.decode(encoded)?)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
