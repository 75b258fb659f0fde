use txforge_script::ScriptType;

/// Error types for transaction wire operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an out-of-range index).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] txforge_script::ScriptError),

    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] txforge_primitives::PrimitivesError),
}

/// Error types for payment template construction and validation.
///
/// Every mismatch variant names the pair of independently supplied
/// sources that disagreed, so a caller can tell which of its inputs to
/// distrust.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// No informative field was supplied.
    #[error("not enough data")]
    NotEnoughData,

    /// An address version byte or bech32 prefix belongs to a different
    /// network than the one requested.
    #[error("invalid version or network mismatch")]
    NetworkMismatch,

    /// The address string itself is malformed for this template.
    #[error("invalid address: {0}")]
    AddressInvalid(String),

    /// Two sources derived different hashes.
    #[error("hash mismatch")]
    HashMismatch,

    /// The supplied output script does not match the template shape.
    #[error("output is invalid")]
    OutputInvalid,

    /// The supplied input script does not match the template shape.
    #[error("input is invalid")]
    InputInvalid,

    /// The supplied witness stack does not match the template shape.
    #[error("witness is invalid")]
    WitnessInvalid,

    /// A supplied public key is not a canonical curve point.
    #[error("invalid pubkey")]
    PubkeyInvalid,

    /// A supplied signature is not canonical.
    #[error("invalid signature")]
    SignatureInvalid,

    /// A supplied pubkey disagrees with one derived from another source.
    #[error("pubkey mismatch")]
    PubkeyMismatch,

    /// A supplied signature disagrees with one derived from another source.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Supplied data pushes disagree with the ones in the output script.
    #[error("data mismatch")]
    DataMismatch,

    /// A supplied witness stack disagrees with the redeem's witness.
    #[error("witness and redeem witness mismatch")]
    WitnessMismatch,

    /// A supplied redeem output disagrees with the one recovered from the
    /// input script.
    #[error("redeem output mismatch")]
    RedeemOutputMismatch,

    /// A supplied redeem input disagrees with the one recovered from the
    /// input script.
    #[error("redeem input mismatch")]
    RedeemInputMismatch,

    /// The redeem output is empty or undecodable.
    #[error("redeem output too short")]
    RedeemOutputTooShort,

    /// A redeem carries neither an input script nor a witness stack.
    #[error("redeem has empty input and witness")]
    RedeemEmpty,

    /// A redeem carries both an input script and a witness stack.
    #[error("redeem input and witness both provided")]
    RedeemAmbiguous,

    /// A redeem scriptSig contains non-push operations.
    #[error("non push-only redeem input")]
    RedeemNonPushOnly,

    /// The supplied `m` disagrees with the output script's threshold.
    #[error("m mismatch")]
    MValueMismatch,

    /// The supplied `n` disagrees with the pubkey count.
    #[error("n mismatch")]
    NValueMismatch,

    /// Fewer pubkeys than the threshold requires.
    #[error("pubkey count cannot be less than m")]
    PubkeyCountTooLow,

    /// Fewer signatures than the threshold requires.
    #[error("not enough signatures provided")]
    NotEnoughSignatures,

    /// More signatures than the threshold allows.
    #[error("too many signatures provided")]
    TooManySignatures,

    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] txforge_script::ScriptError),
}

/// Error types for the transaction builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No input exists at the given index.
    #[error("no input at index {0}")]
    InputIndexOutOfRange(usize),

    /// Coinbase inputs cannot be built or spent by this builder.
    #[error("coinbase inputs not supported")]
    CoinbaseInput,

    /// The same previous outpoint was added twice.
    #[error("duplicate outpoint {txid}:{vout}")]
    DuplicateOutpoint {
        /// Display-order hex txid of the duplicate outpoint.
        txid: String,
        /// Output index of the duplicate outpoint.
        vout: u32,
    },

    /// The requested mutation would invalidate existing signatures.
    #[error("action would invalidate existing signatures")]
    StateViolation,

    /// The matching signature slot is already filled.
    #[error("signature already exists")]
    AlreadySigned,

    /// BIP143 rejects uncompressed public keys in witness programs.
    #[error("uncompressed public keys are not allowed in witness inputs")]
    UncompressedKeyRejected,

    /// The signing key matches none of the input's pubkey slots.
    #[error("key pair cannot sign for this input")]
    KeyNotApplicable,

    /// Signing under this sighash mode requires outputs to exist first.
    #[error("transaction needs outputs")]
    NeedsOutputs,

    /// A redeem script was supplied that differs from the one already
    /// recorded for this input.
    #[error("inconsistent redeem script")]
    InconsistentRedeem,

    /// A witness value was supplied that differs from the recorded one.
    #[error("input value did not match witness value")]
    InconsistentValue,

    /// A witness input cannot be signed without the value it spends.
    #[error("witness input requires a value")]
    MissingValue,

    /// The supplied redeem script does not hash to the previous output.
    #[error("redeem script inconsistent with previous output script")]
    RedeemScriptMismatch,

    /// The supplied witness script does not hash to the previous output.
    #[error("witness script inconsistent with previous output script")]
    WitnessScriptMismatch,

    /// A redeem script was supplied but the previous output is not P2SH.
    #[error("previous output script is not P2SH")]
    PrevOutNotP2sh,

    /// The previous output needs a redeem script to become signable.
    #[error("previous output is {0}, a redeem script is required")]
    RedeemScriptRequired(ScriptType),

    /// The previous output needs a witness script to become signable.
    #[error("previous output is {0}, a witness script is required")]
    WitnessScriptRequired(ScriptType),

    /// The script classifies as a pattern this operation cannot act on.
    #[error("unsupported pattern: {0}")]
    UnsupportedPattern(String),

    /// A final build requires at least one input.
    #[error("transaction has no inputs")]
    NoInputs,

    /// A final build requires at least one output.
    #[error("transaction has no outputs")]
    NoOutputs,

    /// An input was never classified and the build is not incremental.
    #[error("transaction is not complete")]
    TransactionIncomplete,

    /// An input classifies as a type no template can rebuild.
    #[error("input {0} has unknown script type")]
    UnknownInputType(usize),

    /// An input lacks sufficient signing material for a final build.
    #[error("input {0} lacks sufficient signing material")]
    IncompleteInput(usize),

    /// The computed fee rate exceeds the configured ceiling.
    #[error("absurd fee rate: {rate} exceeds maximum {maximum}")]
    AbsurdFee {
        /// Computed fee rate in value units per size unit.
        rate: u64,
        /// The configured ceiling.
        maximum: u64,
    },

    /// An underlying payment template error.
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    /// An underlying transaction error.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] txforge_script::ScriptError),

    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] txforge_primitives::PrimitivesError),
}
