//! Transaction output with value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use txforge_primitives::util::{VarInt, WireReader, WireWriter};
use txforge_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// Each output specifies a `value` in base units (satoshis) and a
/// `locking_script` (scriptPubKey) that defines the conditions under
/// which the funds may be spent.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | value            | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// The number of base units locked by this output.
    pub value: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub locking_script: Script,
}

impl TxOutput {
    /// Create a new `TxOutput` with zero value and an empty script.
    ///
    /// # Returns
    /// A default `TxOutput`.
    pub fn new() -> Self {
        TxOutput {
            value: 0,
            locking_script: Script::new(),
        }
    }

    /// Deserialize a `TxOutput` from a `WireReader`.
    ///
    /// Reads the 8-byte LE value, a varint script length, and the script
    /// bytes.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TxOutput)` on success, or a `TransactionError` if the data is
    /// truncated or malformed.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output value: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TxOutput {
            value,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this `TxOutput` into a `WireWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u64_le(self.value);
        let script_bytes = self.locking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }

    /// Serialize this output to a byte vector.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

impl Default for TxOutput {
    fn default() -> Self {
        Self::new()
    }
}
