//! Bitcoin Script type - a sequence of opcodes and data pushes.
//!
//! Scripts are used in transaction inputs (unlocking) and outputs
//! (locking) to define spending conditions. The Script wraps a `Vec<u8>`
//! and provides methods for construction, chunk access, serialization,
//! and ASM output. Pattern matching against the canonical templates lives
//! in the `classify` module.

use std::fmt;

use crate::chunk::{compile_chunks, decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    ///
    /// # Returns
    /// An empty `Script` instance.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// A `Script` wrapping a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Compile a chunk sequence into a script.
    ///
    /// Data pushes are encoded minimally.
    ///
    /// # Arguments
    /// * `chunks` - The chunk sequence to compile.
    ///
    /// # Returns
    /// The compiled `Script`, or an error if a push is too large.
    pub fn from_chunks(chunks: &[ScriptChunk]) -> Result<Self, ScriptError> {
        Ok(Script(compile_chunks(chunks)?))
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Parses space-separated tokens where known opcodes (e.g. "OP_DUP")
    /// are emitted directly and hex strings are treated as push data.
    ///
    /// # Arguments
    /// * `asm` - A space-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or an error if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for section in asm.split(' ') {
            if let Some(opcode) = string_to_opcode(section) {
                script.append_opcodes(&[opcode])?;
            } else {
                script.append_push_data_hex(section)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a hex string.
    ///
    /// # Returns
    /// A lowercase hex representation of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Each opcode or data push is represented as a space-separated token.
    /// Data pushes appear as their hex encoding; opcodes appear by name.
    ///
    /// # Returns
    /// A space-separated ASM string. Returns an empty string for empty or
    /// undecodable scripts.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(|chunk| chunk.to_asm_string())
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Return a reference to the underlying bytes.
    ///
    /// # Returns
    /// A byte slice of the script contents.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    ///
    /// # Returns
    /// The number of bytes in the script.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    ///
    /// # Returns
    /// `true` if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the script into a vector of decoded chunks.
    ///
    /// # Returns
    /// A vector of `ScriptChunk` values, or an error if the script is malformed.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the proper push prefix.
    ///
    /// Chooses the minimal length-prefixed encoding: direct push for 1-75
    /// bytes, OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append hex-encoded data to the script with the proper push prefix.
    ///
    /// # Arguments
    /// * `hex_str` - Hex string to decode and push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the hex is invalid or data too large.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str).map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4) to prevent
    /// misuse. Use `append_push_data` for those.
    ///
    /// # Arguments
    /// * `opcodes` - Slice of opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if a push data opcode is encountered.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Check if this script is byte-equal to another script.
    ///
    /// # Arguments
    /// * `other` - The other script to compare with.
    ///
    /// # Returns
    /// `true` if both scripts have identical bytes.
    pub fn equals(&self, other: &Script) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the Script type: construction from hex/ASM, serialization
    //! roundtrips, push data operations, opcode appending, and equality.

    use super::*;

    // -----------------------------------------------------------------------
    // Construction & roundtrip tests
    // -----------------------------------------------------------------------

    /// Verify that from_hex correctly decodes a P2PKH script and to_hex
    /// produces the same lowercase hex string.
    #[test]
    fn test_from_hex_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        assert_eq!(script.to_hex(), hex_str);
    }

    /// Verify that from_hex with an empty string produces an empty script.
    #[test]
    fn test_from_hex_empty() {
        let script = Script::from_hex("").expect("empty hex should parse");
        assert!(script.is_empty());
        assert_eq!(script.to_hex(), "");
    }

    /// Verify that from_hex rejects invalid hex characters.
    #[test]
    fn test_from_hex_invalid() {
        assert!(Script::from_hex("ZZZZ").is_err());
    }

    /// Verify that to_asm produces the expected ASM string for a P2PKH script.
    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .expect("valid hex");
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    /// Verify that from_asm correctly parses a P2PKH ASM string.
    #[test]
    fn test_from_asm_p2pkh() {
        let asm =
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";
        let script = Script::from_asm(asm).expect("valid ASM should parse");
        assert_eq!(
            script.to_hex(),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
    }

    /// Verify that hex -> ASM -> hex roundtrip preserves the script.
    #[test]
    fn test_hex_asm_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        let script2 = Script::from_asm(&script.to_asm()).expect("roundtrip ASM should parse");
        assert_eq!(script.to_hex(), script2.to_hex());
    }

    /// Verify from_chunks compiles a P2PKH template.
    #[test]
    fn test_from_chunks() {
        let chunks = vec![
            ScriptChunk::op(OP_DUP),
            ScriptChunk::op(OP_HASH160),
            ScriptChunk::push(vec![0xe2; 20]),
            ScriptChunk::op(OP_EQUALVERIFY),
            ScriptChunk::op(OP_CHECKSIG),
        ];
        let script = Script::from_chunks(&chunks).expect("should compile");
        assert_eq!(script.len(), 25);
        assert_eq!(script.to_bytes()[0], OP_DUP);
    }

    // -----------------------------------------------------------------------
    // Append operations
    // -----------------------------------------------------------------------

    /// Verify append_push_data correctly pushes small data (<=75 bytes).
    #[test]
    fn test_append_push_data_small() {
        let mut script = Script::new();
        script
            .append_push_data(&[0x01, 0x02, 0x03, 0x04, 0x05])
            .expect("push should succeed");
        assert_eq!(script.to_hex(), "050102030405");
    }

    /// Verify append_push_data uses OP_PUSHDATA1 for data in 76..=255 range.
    #[test]
    fn test_append_push_data_medium() {
        let mut script = Script::new();
        script
            .append_push_data(&vec![0xaa; 80])
            .expect("push should succeed");
        let hex_str = script.to_hex();
        assert_eq!(&hex_str[..4], "4c50");
        assert_eq!(hex_str.len(), 4 + 80 * 2);
    }

    /// Verify append_opcodes appends opcodes and rejects push data opcodes.
    #[test]
    fn test_append_opcodes() {
        let mut script = Script::from_asm("OP_2 OP_2 OP_ADD").expect("valid ASM");
        script
            .append_opcodes(&[OP_EQUALVERIFY])
            .expect("should succeed");
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUALVERIFY");

        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
    }

    // -----------------------------------------------------------------------
    // Equality
    // -----------------------------------------------------------------------

    /// Verify byte-equality comparisons.
    #[test]
    fn test_equals() {
        let s1 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        let s2 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        let s3 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26566ac")
            .expect("valid hex");
        assert!(s1.equals(&s2));
        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
    }

    // -----------------------------------------------------------------------
    // Serialization (JSON)
    // -----------------------------------------------------------------------

    /// Verify Script serializes to a hex JSON string.
    #[test]
    fn test_serde_serialize() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY").expect("valid ASM");
        let json_str = serde_json::to_string(&script).expect("should serialize");
        assert_eq!(json_str, r#""5252935488""#);
    }

    /// Verify Script deserializes from a hex JSON string.
    #[test]
    fn test_serde_deserialize() {
        let script: Script = serde_json::from_str(r#""5252935488""#).expect("should deserialize");
        assert_eq!(script.to_hex(), "5252935488");
    }

    // -----------------------------------------------------------------------
    // Display / Debug
    // -----------------------------------------------------------------------

    /// Verify Display outputs the hex string and Debug wraps it.
    #[test]
    fn test_display_debug() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .expect("valid hex");
        assert_eq!(
            format!("{}", script),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
        assert!(format!("{:?}", script).starts_with("Script("));
    }
}
