//! ECDSA signature with a fixed 64-byte compact form.
//!
//! Signing is deterministic (RFC6979) with low-S normalization per
//! BIP-0062. Wire-level DER encoding with the sighash flag lives in the
//! script layer; this type only carries the raw `(r, s)` pair.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{self, SigningKey};

use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// An ECDSA signature with R and S components.
///
/// Stores both components as fixed 32-byte big-endian arrays, the compact
/// form every higher layer works with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The R component of the signature (32 bytes, big-endian).
    r: [u8; 32],
    /// The S component of the signature (32 bytes, big-endian).
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S 32-byte arrays.
    ///
    /// # Arguments
    /// * `r` - The R component (32 bytes, big-endian).
    /// * `s` - The S component (32 bytes, big-endian).
    ///
    /// # Returns
    /// A new `Signature` with the given R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// Access the R component of the signature.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Access the S component of the signature.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a 64-byte compact signature (R followed by S).
    ///
    /// # Arguments
    /// * `bytes` - Exactly 64 bytes: 32-byte R then 32-byte S.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the length is wrong.
    pub fn from_compact(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != 64 {
            return Err(PrimitivesError::InvalidSignature(format!(
                "expected 64 compact bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Signature { r, s })
    }

    /// Serialize the signature in 64-byte compact format (R then S).
    ///
    /// # Returns
    /// A 64-byte array containing R followed by S.
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Sign a 32-byte message hash with RFC6979 deterministic nonces.
    ///
    /// Produces a low-S normalized signature per BIP-0062.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash to sign.
    /// * `signing_key` - The k256 signing key.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if signing fails.
    pub(crate) fn sign_with(
        hash: &[u8; 32],
        signing_key: &SigningKey,
    ) -> Result<Self, PrimitivesError> {
        let (k256_sig, _recovery_id) = signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        // Low-S normalization per BIP-0062.
        let k256_sig = k256_sig.normalize_s().unwrap_or(k256_sig);

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);
        Ok(Signature { r, s })
    }

    /// Verify this signature against a message hash and public key.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash that was signed.
    /// * `pub_key` - The public key to verify against.
    ///
    /// # Returns
    /// `true` if the signature is valid, `false` otherwise.
    pub fn verify(&self, hash: &[u8; 32], pub_key: &PublicKey) -> bool {
        let k256_sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        pub_key
            .verifying_key()
            .verify_prehash(hash, &k256_sig)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::PrivateKey;
    use crate::hash::sha256;

    /// Verify compact round-trip preserves R and S.
    #[test]
    fn test_compact_roundtrip() {
        let mut bytes = [0u8; 64];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let sig = Signature::from_compact(&bytes).expect("valid compact");
        assert_eq!(sig.to_compact(), bytes);
    }

    /// Verify wrong-length compact input is rejected.
    #[test]
    fn test_compact_bad_length() {
        assert!(Signature::from_compact(&[0u8; 63]).is_err());
        assert!(Signature::from_compact(&[0u8; 65]).is_err());
    }

    /// Verify a deterministic sign/verify cycle with a fixed key.
    #[test]
    fn test_sign_verify() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .expect("valid key");
        let hash = sha256(b"Satoshi Nakamoto");

        let sig = key.sign(&hash).expect("should sign");
        assert!(key.pub_key().verify(&hash, &sig));

        // Deterministic: a second signing run yields the same signature.
        let sig2 = key.sign(&hash).expect("should sign");
        assert_eq!(sig, sig2);
    }

    /// Verify a signature fails against a different message.
    #[test]
    fn test_verify_wrong_message() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .expect("valid key");
        let hash = sha256(b"message one");
        let other = sha256(b"message two");

        let sig = key.sign(&hash).expect("should sign");
        assert!(!key.pub_key().verify(&other, &sig));
    }

    /// Verify a signature fails against a different key.
    #[test]
    fn test_verify_wrong_key() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .expect("valid key");
        let other = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000002",
        )
        .expect("valid key");
        let hash = sha256(b"message");

        let sig = key.sign(&hash).expect("should sign");
        assert!(!other.pub_key().verify(&hash, &sig));
    }
}
