/// txforge primitives - hashing, elliptic curve keys, and wire utilities.
///
/// This crate provides the foundational building blocks for the txforge
/// toolkit:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Elliptic curve cryptography (secp256k1 keys and ECDSA signatures)
/// - Base58Check encoding/decoding
/// - Variable-length integer encoding and wire-format reader/writer

pub mod hash;
pub mod util;
pub mod base58;
pub mod ec;

mod error;
pub use error::PrimitivesError;
