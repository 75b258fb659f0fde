//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated
//! bytes. This module decodes raw script bytes into structured chunks,
//! re-encodes chunk sequences with minimal push encoding, and provides the
//! push-only and witness-stack helpers the payment templates rely on.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a Bitcoin script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Create an opcode chunk with no data payload.
    ///
    /// # Arguments
    /// * `op` - The opcode byte.
    pub fn op(op: u8) -> Self {
        ScriptChunk { op, data: None }
    }

    /// Create a data push chunk.
    ///
    /// The stored opcode byte is the minimal push prefix for the payload
    /// length.
    ///
    /// # Arguments
    /// * `data` - The bytes to push.
    pub fn push(data: Vec<u8>) -> Self {
        let op = match data.len() {
            n if n <= 75 => n as u8,
            n if n <= 0xff => OP_PUSHDATA1,
            n if n <= 0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        ScriptChunk { op, data: Some(data) }
    }

    /// Convert this chunk to its ASM string representation.
    ///
    /// Data push chunks are rendered as hex strings; non-push opcodes use
    /// their canonical OP_xxx name.
    ///
    /// # Returns
    /// A string suitable for inclusion in a space-separated ASM output.
    pub fn to_asm_string(&self) -> String {
        if let Some(ref data) = self.data {
            if !data.is_empty() {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op)
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles direct pushes (1-75 bytes) and OP_PUSHDATA1/2/4 extended
/// pushes. All other bytes decode as standalone opcodes, including
/// OP_RETURN: the data carried by a null-data output stays visible as
/// ordinary push chunks after it.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or a `ScriptError` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];

        match op {
            OP_PUSHDATA1 => {
                if bytes.len() < pos + 2 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = bytes[pos + 1] as usize;
                pos += 2;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            OP_PUSHDATA2 => {
                if bytes.len() < pos + 3 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
                pos += 3;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            OP_PUSHDATA4 => {
                if bytes.len() < pos + 5 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize;
                pos += 5;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos..pos + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += length;
            }
            0x01..=0x4b => {
                // Direct push: op byte is the number of bytes to push.
                let length = op as usize;
                if bytes.len() < pos + 1 + length {
                    return Err(ScriptError::DataTooSmall);
                }
                let data = bytes[pos + 1..pos + 1 + length].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                pos += 1 + length;
            }
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
        }
    }

    Ok(chunks)
}

/// Compute the push prefix bytes for a data payload of the given length.
///
/// Chooses the minimal encoding: direct push for up to 75 bytes,
/// OP_PUSHDATA1 for up to 255, OP_PUSHDATA2 for up to 65535, and
/// OP_PUSHDATA4 beyond that.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// A byte vector containing the prefix, or an error if the data is too
/// large for the protocol.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFFFFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode a data payload with minimal-opcode push semantics.
///
/// An empty payload becomes OP_0, a single byte 1..=16 becomes the
/// matching small-integer opcode, a single 0x81 byte becomes OP_1NEGATE,
/// and everything else gets a length-prefixed push.
fn write_minimal_push(out: &mut Vec<u8>, data: &[u8]) -> Result<(), ScriptError> {
    if data.is_empty() {
        out.push(OP_0);
        return Ok(());
    }
    if data.len() == 1 {
        let b = data[0];
        if (1..=16).contains(&b) {
            out.push(OP_RESERVED + b);
            return Ok(());
        }
        if b == 0x81 {
            out.push(OP_1NEGATE);
            return Ok(());
        }
    }
    let prefix = push_data_prefix(data.len())?;
    out.extend_from_slice(&prefix);
    out.extend_from_slice(data);
    Ok(())
}

/// Compile a chunk sequence back into raw script bytes.
///
/// Data chunks are re-encoded minimally (including the small-integer
/// opcode substitutions), so compiling a decoded script normalizes any
/// non-minimal pushes.
///
/// # Arguments
/// * `chunks` - The chunk sequence to compile.
///
/// # Returns
/// The compiled script bytes, or an error if a push is too large.
pub fn compile_chunks(chunks: &[ScriptChunk]) -> Result<Vec<u8>, ScriptError> {
    let mut out = Vec::new();
    for chunk in chunks {
        match &chunk.data {
            Some(data) => write_minimal_push(&mut out, data)?,
            None => out.push(chunk.op),
        }
    }
    Ok(out)
}

/// Compile a list of raw data payloads into a script of minimal pushes.
///
/// # Arguments
/// * `parts` - Slice of data byte slices to encode, in order.
///
/// # Returns
/// The compiled script bytes, or an error if any part is too large.
pub fn compile_pushes(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut out = Vec::new();
    for part in parts {
        write_minimal_push(&mut out, part)?;
    }
    Ok(out)
}

/// Check whether every chunk is a push operation.
///
/// Data chunks, OP_0, OP_1NEGATE, and the small-integer opcodes all count
/// as pushes; anything else fails.
///
/// # Arguments
/// * `chunks` - The chunk sequence to inspect.
///
/// # Returns
/// `true` if the sequence is push-only.
pub fn is_push_only(chunks: &[ScriptChunk]) -> bool {
    chunks.iter().all(|chunk| {
        chunk.data.is_some()
            || chunk.op == OP_0
            || chunk.op == OP_1NEGATE
            || is_small_int_op(chunk.op)
    })
}

/// Convert a push-only chunk sequence into a witness stack.
///
/// Data chunks contribute their payload, OP_0 contributes an empty
/// element, small-integer opcodes contribute their single-byte minimal
/// encoding, and OP_1NEGATE contributes 0x81.
///
/// # Arguments
/// * `chunks` - The push-only chunk sequence.
///
/// # Returns
/// The stack elements in order, or `NonPushOnly` if a non-push opcode is
/// present.
pub fn to_stack(chunks: &[ScriptChunk]) -> Result<Vec<Vec<u8>>, ScriptError> {
    chunks
        .iter()
        .map(|chunk| match &chunk.data {
            Some(data) => Ok(data.clone()),
            None if chunk.op == OP_0 => Ok(Vec::new()),
            None if is_small_int_op(chunk.op) => Ok(vec![chunk.op - OP_RESERVED]),
            None if chunk.op == OP_1NEGATE => Ok(vec![0x81]),
            None => Err(ScriptError::NonPushOnly),
        })
        .collect()
}
