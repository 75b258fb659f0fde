/// Error types for script operations.
///
/// Covers parsing errors, signature codec failures, address validation,
/// and script classification problems.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error (undecodable push lengths etc.).
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// The DER structure of a script signature is malformed (BIP66).
    #[error("invalid DER signature: {0}")]
    InvalidDer(String),

    /// The sighash flag byte is outside the allowed range.
    #[error("invalid hashType {0}")]
    InvalidHashType(u8),

    /// Not enough data in a script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds the maximum encodable size.
    #[error("data too big")]
    DataTooBig,

    /// Attempted to append a push-data opcode through `append_opcodes`.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid opcode data encountered during ASM parsing.
    #[error("invalid opcode data")]
    InvalidOpcodeData,

    /// A chunk sequence contained non-push operations where only pushes
    /// are allowed.
    #[error("non push-only script")]
    NonPushOnly,

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The address form is recognized by no codec for the given network.
    #[error("{0} has no matching script")]
    UnknownAddressForm(String),

    /// Error from the primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] txforge_primitives::PrimitivesError),
}
