//! Compact binary index format.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "BKSX"
//!      4     8  xxh3-64 of the payload, little-endian
//!     12     *  postcard-encoded bundle
//! ```

use super::IndexBundle;
use crate::error::LoadError;
use xxhash_rust::xxh3::xxh3_64;

pub const MAGIC: [u8; 4] = *b"BKSX";

const HEADER_LEN: usize = MAGIC.len() + 8;

/// Whether `bytes` start like a binary index.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

pub fn encode(bundle: &IndexBundle) -> Result<Vec<u8>, postcard::Error> {
    let payload = postcard::to_stdvec(bundle)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&xxh3_64(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode and fully validate a binary index.
pub fn decode(bytes: &[u8]) -> Result<IndexBundle, LoadError> {
    if !is_binary(bytes) || bytes.len() < HEADER_LEN {
        return Err(LoadError::BadMagic);
    }
    let mut stored = [0u8; 8];
    stored.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let expected = u64::from_le_bytes(stored);

    let payload = &bytes[HEADER_LEN..];
    let found = xxh3_64(payload);
    if found != expected {
        return Err(LoadError::ChecksumMismatch { expected, found });
    }

    let bundle: IndexBundle = postcard::from_bytes(payload)?;
    bundle.validate()?;
    Ok(bundle)
}
