//! Base58Check encoding and decoding.
//!
//! Base58Check wraps a payload with a version byte prefix and a 4-byte
//! double-SHA256 checksum suffix. Used for legacy Bitcoin addresses and
//! WIF private keys.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Encode a payload as a Base58Check string.
///
/// Appends the first 4 bytes of `sha256d(payload)` as a checksum before
/// Base58 encoding. The payload is expected to already carry its version
/// byte prefix.
///
/// # Arguments
/// * `payload` - The bytes to encode (version byte plus data).
///
/// # Returns
/// The Base58Check string.
pub fn encode_check(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum[..4]);
    bs58::encode(buf).into_string()
}

/// Decode a Base58Check string and verify its checksum.
///
/// # Arguments
/// * `input` - The Base58Check string.
///
/// # Returns
/// The decoded payload with the checksum stripped, or an error if the
/// string contains invalid characters, is too short, or fails the
/// checksum test.
pub fn decode_check(input: &str) -> Result<Vec<u8>, PrimitivesError> {
    let decoded = bs58::decode(input)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))?;

    if decoded.len() < 5 {
        return Err(PrimitivesError::InvalidBase58(format!(
            "payload too short: {} bytes",
            decoded.len()
        )));
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    let expected = sha256d(payload);
    if checksum != &expected[..4] {
        return Err(PrimitivesError::ChecksumMismatch);
    }

    Ok(payload.to_vec())
}
