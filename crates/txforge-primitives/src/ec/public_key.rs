//! secp256k1 public key.
//!
//! Supports compressed/uncompressed SEC1 serialization, Hash160
//! computation for address derivation, and ECDSA signature verification.

use std::fmt;

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32-byte x-coordinate).
const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + x + y coordinates).
const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
///
/// Wraps a k256 `VerifyingKey` and provides Bitcoin-specific functionality:
/// compressed/uncompressed serialization, Hash160, and ECDSA verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// The underlying k256 verifying key.
    inner: VerifyingKey,
}

impl PublicKey {
    /// Create a PublicKey from raw SEC1 encoded bytes.
    ///
    /// Accepts both compressed (33-byte) and uncompressed (65-byte) formats.
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes do not encode
    /// a valid curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "public key is empty".to_string(),
            ));
        }
        let vk = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner: vk })
    }

    /// Create a PublicKey from a hex-encoded SEC1 string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of a compressed or uncompressed key.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the hex or point is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Wrap an existing k256 verifying key.
    pub(crate) fn from_verifying_key(vk: VerifyingKey) -> Self {
        PublicKey { inner: vk }
    }

    /// Serialize the public key in compressed SEC1 format (33 bytes).
    ///
    /// # Returns
    /// A 33-byte array: 0x02/0x03 prefix plus the x-coordinate.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize the public key in uncompressed SEC1 format (65 bytes).
    ///
    /// # Returns
    /// A 65-byte array: 0x04 prefix plus the x and y coordinates.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Compute the Hash160 of the compressed key serialization.
    ///
    /// # Returns
    /// The 20-byte RIPEMD-160(SHA-256(compressed pubkey)) digest.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_compressed())
    }

    /// Verify an ECDSA signature over a 32-byte message hash.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash that was signed.
    /// * `signature` - The signature to check.
    ///
    /// # Returns
    /// `true` if the signature is valid for this key.
    pub fn verify(&self, hash: &[u8; 32], signature: &Signature) -> bool {
        signature.verify(hash, self)
    }

    /// Access the underlying k256 verifying key.
    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl fmt::Display for PublicKey {
    /// Display the key as its compressed hex encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_compressed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A known compressed public key (generator point).
    const GENERATOR_COMPRESSED: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    /// Verify parsing and re-serializing a compressed key is lossless.
    #[test]
    fn test_compressed_roundtrip() {
        let key = PublicKey::from_hex(GENERATOR_COMPRESSED).expect("valid key");
        assert_eq!(hex::encode(key.to_compressed()), GENERATOR_COMPRESSED);
    }

    /// Verify the uncompressed form of the generator point.
    #[test]
    fn test_uncompressed() {
        let key = PublicKey::from_hex(GENERATOR_COMPRESSED).expect("valid key");
        let uncompressed = key.to_uncompressed();
        assert_eq!(uncompressed.len(), 65);
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(
            hex::encode(&uncompressed[1..33]),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    /// Verify an uncompressed encoding parses back to the same point.
    #[test]
    fn test_from_uncompressed() {
        let key = PublicKey::from_hex(GENERATOR_COMPRESSED).expect("valid key");
        let uncompressed = key.to_uncompressed();
        let reparsed = PublicKey::from_bytes(&uncompressed).expect("valid uncompressed");
        assert_eq!(reparsed.to_compressed(), key.to_compressed());
    }

    /// Verify invalid points are rejected.
    #[test]
    fn test_invalid_point() {
        // x = 0 is not on the curve
        let result = PublicKey::from_hex(
            "020000000000000000000000000000000000000000000000000000000000000000",
        );
        assert!(result.is_err());
    }

    /// Verify empty input is rejected.
    #[test]
    fn test_empty() {
        assert!(PublicKey::from_bytes(&[]).is_err());
    }
}
