//! secp256k1 private key.
//!
//! Wraps a k256 signing key and adds WIF serialization and a public key
//! compression flag. The flag decides which SEC1 form `pub_key_bytes`
//! produces, mirroring how wallet keys carry their compression preference
//! through WIF.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key scalar in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Mainnet WIF version byte.
const MAINNET_WIF: u8 = 0x80;

/// Testnet WIF version byte.
const TESTNET_WIF: u8 = 0xef;

/// Flag byte appended to WIF payloads for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key for ECDSA signing.
///
/// Carries a `compressed` flag selecting the SEC1 form of the derived
/// public key. Witness programs require compressed keys; the legacy
/// script paths accept either form.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    /// The underlying k256 signing key.
    inner: SigningKey,

    /// Whether the derived public key serializes in compressed form.
    compressed: bool,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    ///
    /// The key defaults to compressed public key serialization.
    ///
    /// # Returns
    /// A new randomly generated `PrivateKey`.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
            compressed: true,
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte slice representing the private key scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a valid non-zero scalar,
    /// or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner: signing_key,
            compressed: true,
        })
    }

    /// Create a private key from a hexadecimal string.
    ///
    /// # Arguments
    /// * `hex_str` - A 64-character hex string representing the scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hex or scalar is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Create a private key from a WIF (Wallet Import Format) string.
    ///
    /// Accepts mainnet (0x80) and testnet (0xef) version bytes and both
    /// compressed (38-byte payload) and uncompressed (37-byte payload)
    /// encodings. The compression flag is retained on the returned key.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the WIF is malformed
    /// or the checksum fails.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let payload = base58::decode_check(wif)
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        let compressed = match payload.len() {
            34 => {
                if payload[33] != COMPRESS_MAGIC {
                    return Err(PrimitivesError::InvalidWif(
                        "invalid compression flag".to_string(),
                    ));
                }
                true
            }
            33 => false,
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid payload length {}",
                    n
                )));
            }
        };

        if payload[0] != MAINNET_WIF && payload[0] != TESTNET_WIF {
            return Err(PrimitivesError::InvalidWif(format!(
                "unknown version byte 0x{:02x}",
                payload[0]
            )));
        }

        let mut key = Self::from_bytes(&payload[1..33])?;
        key.compressed = compressed;
        Ok(key)
    }

    /// Encode the private key as a mainnet WIF string.
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string honoring the compression flag.
    pub fn to_wif(&self) -> String {
        self.to_wif_prefix(MAINNET_WIF)
    }

    /// Encode the private key as a WIF string with a custom version byte.
    ///
    /// # Arguments
    /// * `prefix` - The network version byte (0x80 mainnet, 0xef testnet).
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string honoring the compression flag.
    pub fn to_wif_prefix(&self, prefix: u8) -> String {
        let key_bytes = self.to_bytes();
        let mut payload = Vec::with_capacity(2 + PRIVATE_KEY_BYTES_LEN);
        payload.push(prefix);
        payload.extend_from_slice(&key_bytes);
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        base58::encode_check(&payload)
    }

    /// Serialize the private key as a 32-byte big-endian array.
    ///
    /// # Returns
    /// A 32-byte array containing the private key scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Whether the derived public key serializes in compressed form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Set the public key compression preference.
    ///
    /// # Arguments
    /// * `compressed` - `true` for 33-byte keys, `false` for 65-byte keys.
    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// Derive the corresponding public key.
    ///
    /// # Returns
    /// The `PublicKey` for this private key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.inner.verifying_key())
    }

    /// Serialize the derived public key honoring the compression flag.
    ///
    /// # Returns
    /// 33 bytes when compressed, 65 bytes otherwise.
    pub fn pub_key_bytes(&self) -> Vec<u8> {
        let pk = self.pub_key();
        if self.compressed {
            pk.to_compressed().to_vec()
        } else {
            pk.to_uncompressed().to_vec()
        }
    }

    /// Sign a 32-byte message hash.
    ///
    /// Uses RFC6979 deterministic nonces and low-S normalization.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash to sign.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if signing fails.
    pub fn sign(&self, hash: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign_with(hash, &self.inner)
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The scalar 1 in hex, whose public key is the generator point.
    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    /// Verify from_hex and the derived public key for scalar 1.
    #[test]
    fn test_from_hex_generator() {
        let key = PrivateKey::from_hex(KEY_ONE).expect("valid key");
        assert_eq!(
            hex::encode(key.pub_key().to_compressed()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    /// Verify the zero scalar is rejected.
    #[test]
    fn test_zero_scalar_rejected() {
        let result = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000000",
        );
        assert!(result.is_err());
    }

    /// Verify wrong-length input is rejected.
    #[test]
    fn test_bad_length() {
        assert!(PrivateKey::from_bytes(&[0x01; 31]).is_err());
        assert!(PrivateKey::from_bytes(&[0x01; 33]).is_err());
    }

    /// Verify a known compressed WIF round-trips.
    #[test]
    fn test_wif_roundtrip_compressed() {
        // WIF for scalar 1, compressed, mainnet.
        let wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
        let key = PrivateKey::from_wif(wif).expect("valid WIF");
        assert!(key.is_compressed());
        assert_eq!(hex::encode(key.to_bytes()), KEY_ONE);
        assert_eq!(key.to_wif(), wif);
    }

    /// Verify a known uncompressed WIF round-trips.
    #[test]
    fn test_wif_roundtrip_uncompressed() {
        // WIF for scalar 1, uncompressed, mainnet.
        let wif = "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf";
        let key = PrivateKey::from_wif(wif).expect("valid WIF");
        assert!(!key.is_compressed());
        assert_eq!(key.pub_key_bytes().len(), 65);
        assert_eq!(key.to_wif(), wif);
    }

    /// Verify a corrupted WIF fails the checksum.
    #[test]
    fn test_wif_bad_checksum() {
        let result = PrivateKey::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWm");
        assert!(result.is_err());
    }

    /// Verify pub_key_bytes honors the compression flag.
    #[test]
    fn test_pub_key_bytes_flag() {
        let mut key = PrivateKey::from_hex(KEY_ONE).expect("valid key");
        assert_eq!(key.pub_key_bytes().len(), 33);
        key.set_compressed(false);
        assert_eq!(key.pub_key_bytes().len(), 65);
    }

    /// Verify random key generation produces distinct signable keys.
    #[test]
    fn test_random_keys() {
        let a = PrivateKey::new();
        let b = PrivateKey::new();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
