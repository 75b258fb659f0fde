//! Elliptic curve cryptography for the txforge toolkit.
//!
//! secp256k1 private/public keys and ECDSA signatures built on `k256`.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
