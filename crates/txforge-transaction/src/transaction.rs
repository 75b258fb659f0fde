//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! lock time. Supports the legacy wire format and the BIP144 segregated
//! witness framing (marker/flag plus per-input witness stacks), txid
//! computation, weight/virtual-size, and the two signature hash
//! algorithms (legacy and BIP143, delegated to the `sighash` module).

use txforge_primitives::hash::sha256d;
use txforge_primitives::util::{VarInt, WireReader, WireWriter};
use txforge_script::Script;

use crate::input::TxInput;
use crate::output::TxOutput;
use crate::sighash;
use crate::TransactionError;

/// BIP144 marker byte distinguishing witness serialization.
const SEGWIT_MARKER: u8 = 0x00;

/// BIP144 flag byte following the marker.
const SEGWIT_FLAG: u8 = 0x01;

/// A transaction consisting of a version, inputs, outputs, and lock time.
///
/// # Wire format (legacy)
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
///
/// When any input carries a witness stack, the BIP144 form inserts the
/// 0x00 marker and 0x01 flag after the version and the per-input witness
/// stacks before the lock time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version. Currently 1 or 2.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TxInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TxOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    ///
    /// # Returns
    /// A `Transaction` with no inputs or outputs.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Check whether a previous-output hash marks a coinbase input.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte previous txid in internal order.
    ///
    /// # Returns
    /// `true` if the hash is all zeros.
    pub fn is_coinbase_hash(hash: &[u8; 32]) -> bool {
        hash.iter().all(|&b| b == 0)
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex
    /// is invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// Accepts both the legacy and the BIP144 witness serialization. The
    /// byte slice must contain exactly one complete transaction with no
    /// trailing data.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `WireReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized
    ///   transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` on format
    /// errors.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        // BIP144: a zero marker byte followed by the 0x01 flag announces
        // witness framing. A legacy transaction can never start its input
        // count with 0x00, so the peek is unambiguous.
        let has_witness =
            reader.peek(0) == Some(SEGWIT_MARKER) && reader.peek(1) == Some(SEGWIT_FLAG);
        if has_witness {
            reader.read_bytes(2).map_err(|e| {
                TransactionError::SerializationError(format!("reading segwit marker: {}", e))
            })?;
        }

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        let mut inputs = Vec::with_capacity(input_count.value() as usize);
        for _ in 0..input_count.value() {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity(output_count.value() as usize);
        for _ in 0..output_count.value() {
            outputs.push(TxOutput::read_from(reader)?);
        }

        if has_witness {
            for input in &mut inputs {
                input.read_witness_from(reader)?;
            }
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Check whether any input carries a witness stack.
    ///
    /// # Returns
    /// `true` if at least one input has a non-empty witness.
    pub fn has_witnesses(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Serialize this transaction into a `WireWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    /// * `allow_witness` - Emit the BIP144 framing when witnesses exist.
    pub fn write_to(&self, writer: &mut WireWriter, allow_witness: bool) {
        let with_witness = allow_witness && self.has_witnesses();

        writer.write_u32_le(self.version);

        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.write_witness_to(writer);
            }
        }

        writer.write_u32_le(self.lock_time);
    }

    /// Serialize this transaction to raw bytes, witness framing included
    /// when any input carries a witness.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        self.write_to(&mut writer, true);
        writer.into_bytes()
    }

    /// Serialize this transaction without witness data.
    ///
    /// This is the form hashed for the transaction ID.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the legacy wire-format bytes.
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        self.write_to(&mut writer, false);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    ///
    /// # Returns
    /// A lowercase hex-encoded string of the raw bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Transaction ID and size
    // -----------------------------------------------------------------

    /// Compute the transaction ID (double SHA-256 of the non-witness
    /// serialization).
    ///
    /// The txid bytes are in internal (little-endian) order. To get the
    /// conventional display string, use `tx_id_hex()`.
    ///
    /// # Returns
    /// A 32-byte array containing the txid in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes_no_witness())
    }

    /// Compute the transaction ID as a human-readable hex string.
    ///
    /// The hex string is byte-reversed from the internal hash, following
    /// the convention that txids display in big-endian order.
    ///
    /// # Returns
    /// A 64-character hex string of the txid.
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    /// Return the full serialized size of this transaction in bytes.
    ///
    /// # Returns
    /// The byte length including any witness data.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Compute the BIP141 transaction weight.
    ///
    /// Weight is three times the non-witness size plus the full size, so
    /// witness bytes cost a quarter of base bytes.
    ///
    /// # Returns
    /// The weight in weight units.
    pub fn weight(&self) -> usize {
        self.to_bytes_no_witness().len() * 3 + self.size()
    }

    /// Compute the virtual size (weight divided by four, rounded up).
    ///
    /// # Returns
    /// The virtual size in vbytes.
    pub fn virtual_size(&self) -> usize {
        (self.weight() + 3) / 4
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    /// Append a `TxInput` to this transaction.
    ///
    /// # Arguments
    /// * `input` - The input to add.
    ///
    /// # Returns
    /// The index of the new input.
    pub fn add_input(&mut self, input: TxInput) -> usize {
        self.inputs.push(input);
        self.inputs.len() - 1
    }

    /// Append a `TxOutput` to this transaction.
    ///
    /// # Arguments
    /// * `output` - The output to add.
    ///
    /// # Returns
    /// The index of the new output.
    pub fn add_output(&mut self, output: TxOutput) -> usize {
        self.outputs.push(output);
        self.outputs.len() - 1
    }

    /// Replace the unlocking script of an input.
    ///
    /// # Arguments
    /// * `index` - Input index.
    /// * `script` - The new unlocking script.
    pub fn set_input_script(&mut self, index: usize, script: Script) {
        self.inputs[index].unlocking_script = script;
    }

    /// Replace the witness stack of an input.
    ///
    /// # Arguments
    /// * `index` - Input index.
    /// * `witness` - The new witness stack.
    pub fn set_witness(&mut self, index: usize, witness: Vec<Vec<u8>>) {
        self.inputs[index].witness = witness;
    }

    /// Determine whether this transaction is a coinbase transaction.
    ///
    /// A coinbase transaction has exactly one input spending the all-zero
    /// previous txid.
    ///
    /// # Returns
    /// `true` if this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && Self::is_coinbase_hash(&self.inputs[0].source_txid)
    }

    // -----------------------------------------------------------------
    // Signature hashes
    // -----------------------------------------------------------------

    /// Compute the legacy signature hash for one input.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input being signed.
    /// * `prev_out_script` - The script being satisfied (scriptCode).
    /// * `hash_type` - The sighash flag byte.
    ///
    /// # Returns
    /// The 32-byte hash to sign, or an error if the script is undecodable.
    pub fn hash_for_signature(
        &self,
        input_index: usize,
        prev_out_script: &Script,
        hash_type: u8,
    ) -> Result<[u8; 32], TransactionError> {
        sighash::legacy_signature_hash(self, input_index, prev_out_script, hash_type)
    }

    /// Compute the BIP143 witness v0 signature hash for one input.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input being signed.
    /// * `script_code` - The script code being satisfied.
    /// * `value` - The value of the output being spent.
    /// * `hash_type` - The sighash flag byte.
    ///
    /// # Returns
    /// The 32-byte hash to sign, or an error if the index is out of range.
    pub fn hash_for_witness_v0(
        &self,
        input_index: usize,
        script_code: &Script,
        value: u64,
        hash_type: u8,
    ) -> Result<[u8; 32], TransactionError> {
        sighash::witness_v0_signature_hash(self, input_index, script_code, value, hash_type)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
