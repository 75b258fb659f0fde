//! Transaction input referencing a previous output.
//!
//! Contains the source transaction ID, output index, unlocking script,
//! sequence number, and the witness stack for segregated-witness spends.
//! Provides binary serialization/deserialization following the Bitcoin
//! wire format (the witness stack serializes separately, in the BIP144
//! framing handled by `Transaction`).

use txforge_primitives::util::{VarInt, WireReader, WireWriter};
use txforge_script::Script;

use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction ID (`source_txid`, internal byte order) and output index
/// (`source_vout`). The `unlocking_script` (scriptSig) and/or `witness`
/// stack supply the data required to satisfy the referenced output's
/// locking script.
///
/// # Wire format (non-witness portion)
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_vout        | 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence           | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    /// The 32-byte transaction ID of the output being spent, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_vout: u32,

    /// The unlocking script (scriptSig). Empty when unsigned or when the
    /// unlocking data lives in the witness.
    pub unlocking_script: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence: u32,

    /// The witness stack for this input. Empty for non-witness spends.
    pub witness: Vec<Vec<u8>>,
}

impl TxInput {
    /// Create a new `TxInput` with default values.
    ///
    /// The source txid is zeroed, output index is 0, sequence is
    /// finalized, and the unlocking script and witness are empty.
    ///
    /// # Returns
    /// A default `TxInput`.
    pub fn new() -> Self {
        TxInput {
            source_txid: [0u8; 32],
            source_vout: 0,
            unlocking_script: Script::new(),
            sequence: DEFAULT_SEQUENCE,
            witness: Vec::new(),
        }
    }

    /// Deserialize the non-witness portion of a `TxInput`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TxInput)` on success, or a `TransactionError` if the data is
    /// truncated or malformed.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TxInput {
            source_txid,
            source_vout,
            unlocking_script: Script::from_bytes(script_bytes),
            sequence,
            witness: Vec::new(),
        })
    }

    /// Serialize the non-witness portion of this `TxInput`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_vout);
        let script_bytes = self.unlocking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_u32_le(self.sequence);
    }

    /// Serialize this input's witness stack in BIP144 framing.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_witness_to(&self, writer: &mut WireWriter) {
        writer.write_varint(VarInt::from(self.witness.len()));
        for item in &self.witness {
            writer.write_varint(VarInt::from(item.len()));
            writer.write_bytes(item);
        }
    }

    /// Read this input's witness stack in BIP144 framing.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the input's witness count.
    ///
    /// # Returns
    /// `Ok(())` with the stack stored on the input, or a
    /// `TransactionError` if the data is truncated.
    pub fn read_witness_from(&mut self, reader: &mut WireReader) -> Result<(), TransactionError> {
        let count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading witness count: {}", e))
        })?;
        let mut stack = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            let len = reader.read_varint().map_err(|e| {
                TransactionError::SerializationError(format!("reading witness item length: {}", e))
            })?;
            let item = reader.read_bytes(len.value() as usize).map_err(|e| {
                TransactionError::SerializationError(format!("reading witness item: {}", e))
            })?;
            stack.push(item.to_vec());
        }
        self.witness = stack;
        Ok(())
    }
}

impl Default for TxInput {
    fn default() -> Self {
        Self::new()
    }
}
