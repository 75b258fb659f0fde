/// Unified error type for all primitives operations.
///
/// Covers errors from hashing, EC operations, encoding, and key handling.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// The private key scalar is zero, out of range, or the wrong length.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The public key bytes do not encode a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature bytes are malformed or out of range.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A WIF string is malformed.
    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    /// A Base58Check checksum did not match.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid Base58 input.
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    /// A reader ran out of data mid-field.
    #[error("unexpected end of data")]
    UnexpectedEof,
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}
