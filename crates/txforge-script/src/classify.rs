//! Script classification against the canonical output, input, and witness
//! templates.
//!
//! Output classification tries the four hash-based patterns directly on
//! the compiled buffer before paying for a decompilation; the chunk-based
//! matchers run afterwards. Input and witness classification always work
//! on chunks. The same type tag names different matchers in output and
//! input context.

use std::fmt;

use txforge_primitives::ec::PublicKey;

use crate::chunk::{decode_script, is_push_only, ScriptChunk};
use crate::opcodes::*;
use crate::signature::is_canonical_script_signature;
use crate::{Script, ScriptError};

/// The canonical script patterns the toolkit understands.
///
/// Everything that matches no template classifies as `NonStandard`;
/// classification itself never fails on well-formed scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptType {
    /// Pay-to-pubkey-hash.
    P2pkh,
    /// Pay-to-script-hash.
    P2sh,
    /// Pay-to-witness-pubkey-hash (segwit v0, 20-byte program).
    P2wpkh,
    /// Pay-to-witness-script-hash (segwit v0, 32-byte program).
    P2wsh,
    /// Pay-to-pubkey.
    P2pk,
    /// Bare multisig.
    P2ms,
    /// Provably unspendable data-carrier output.
    NullData,
    /// Segwit commitment output in a coinbase transaction.
    WitnessCommitment,
    /// No template matched.
    NonStandard,
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptType::P2pkh => "pubkeyhash",
            ScriptType::P2sh => "scripthash",
            ScriptType::P2wpkh => "witnesspubkeyhash",
            ScriptType::P2wsh => "witnessscripthash",
            ScriptType::P2pk => "pubkey",
            ScriptType::P2ms => "multisig",
            ScriptType::NullData => "nulldata",
            ScriptType::WitnessCommitment => "witnesscommitment",
            ScriptType::NonStandard => "nonstandard",
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// Canonical element predicates
// ---------------------------------------------------------------------------

/// Check whether a buffer is a canonical SEC1 public key.
///
/// Accepts a 33-byte compressed (0x02/0x03 prefix) or 65-byte
/// uncompressed (0x04 prefix) encoding of a valid curve point.
///
/// # Arguments
/// * `buffer` - The candidate public key bytes.
///
/// # Returns
/// `true` if the buffer encodes a valid point.
pub fn is_canonical_pubkey(buffer: &[u8]) -> bool {
    let shape_ok = match buffer.len() {
        33 => buffer[0] == 0x02 || buffer[0] == 0x03,
        65 => buffer[0] == 0x04,
        _ => false,
    };
    shape_ok && PublicKey::from_bytes(buffer).is_ok()
}

/// Check whether a buffer is a canonical compressed public key.
///
/// # Arguments
/// * `buffer` - The candidate public key bytes.
///
/// # Returns
/// `true` for a valid 33-byte compressed key.
pub fn is_compressed_canonical_pubkey(buffer: &[u8]) -> bool {
    buffer.len() == 33 && is_canonical_pubkey(buffer)
}

// ---------------------------------------------------------------------------
// Output matchers
// ---------------------------------------------------------------------------

/// Match `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn is_p2pkh_output(buffer: &[u8]) -> bool {
    buffer.len() == 25
        && buffer[0] == OP_DUP
        && buffer[1] == OP_HASH160
        && buffer[2] == OP_DATA_20
        && buffer[23] == OP_EQUALVERIFY
        && buffer[24] == OP_CHECKSIG
}

/// Match `OP_HASH160 <20 bytes> OP_EQUAL`, exactly 23 bytes.
pub fn is_p2sh_output(buffer: &[u8]) -> bool {
    buffer.len() == 23
        && buffer[0] == OP_HASH160
        && buffer[1] == OP_DATA_20
        && buffer[22] == OP_EQUAL
}

/// Match `OP_0 <20 bytes>`, exactly 22 bytes.
pub fn is_p2wpkh_output(buffer: &[u8]) -> bool {
    buffer.len() == 22 && buffer[0] == OP_0 && buffer[1] == OP_DATA_20
}

/// Match `OP_0 <32 bytes>`, exactly 34 bytes.
pub fn is_p2wsh_output(buffer: &[u8]) -> bool {
    buffer.len() == 34 && buffer[0] == OP_0 && buffer[1] == OP_DATA_32
}

/// Match `<canonical pubkey> OP_CHECKSIG`, exactly 2 chunks.
pub fn is_p2pk_output(chunks: &[ScriptChunk]) -> bool {
    if chunks.len() != 2 {
        return false;
    }
    let pubkey = match &chunks[0].data {
        Some(data) => data,
        None => return false,
    };
    chunks[1].op == OP_CHECKSIG && chunks[1].data.is_none() && is_canonical_pubkey(pubkey)
}

/// Match `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`.
///
/// With `allow_incomplete` the pubkeys are not individually point-checked,
/// matching the relaxed template used during classification of scripts we
/// only need to recognize, not spend.
pub fn is_p2ms_output(chunks: &[ScriptChunk], allow_incomplete: bool) -> bool {
    if chunks.len() < 4 {
        return false;
    }
    let last = &chunks[chunks.len() - 1];
    if last.op != OP_CHECKMULTISIG || last.data.is_some() {
        return false;
    }

    let m_chunk = &chunks[0];
    let n_chunk = &chunks[chunks.len() - 2];
    if m_chunk.data.is_some() || n_chunk.data.is_some() {
        return false;
    }
    if !is_small_int_op(m_chunk.op) || !is_small_int_op(n_chunk.op) {
        return false;
    }

    let m = (m_chunk.op - OP_RESERVED) as usize;
    let n = (n_chunk.op - OP_RESERVED) as usize;
    if m == 0 || m > n {
        return false;
    }
    if n != chunks.len() - 3 {
        return false;
    }
    if allow_incomplete {
        return true;
    }

    chunks[1..chunks.len() - 2]
        .iter()
        .all(|chunk| matches!(&chunk.data, Some(data) if is_canonical_pubkey(data)))
}

/// Match a segwit commitment: `OP_RETURN <36 bytes starting aa21a9ed>`.
pub fn is_witness_commitment_output(buffer: &[u8]) -> bool {
    buffer.len() > 37
        && buffer[0] == OP_RETURN
        && buffer[1] == 0x24
        && buffer[2..6] == [0xaa, 0x21, 0xa9, 0xed]
}

/// Match a null-data output: starts with OP_RETURN, more than one byte.
pub fn is_null_data_output(buffer: &[u8]) -> bool {
    buffer.len() > 1 && buffer[0] == OP_RETURN
}

// ---------------------------------------------------------------------------
// Input matchers
// ---------------------------------------------------------------------------

/// Match `<signature> <pubkey>` (2 chunks, both canonical).
pub fn is_p2pkh_input(chunks: &[ScriptChunk]) -> bool {
    if chunks.len() != 2 {
        return false;
    }
    match (&chunks[0].data, &chunks[1].data) {
        (Some(sig), Some(pubkey)) => {
            is_canonical_script_signature(sig) && is_canonical_pubkey(pubkey)
        }
        _ => false,
    }
}

/// Match `<signature>` (a single canonical signature chunk).
pub fn is_p2pk_input(chunks: &[ScriptChunk]) -> bool {
    chunks.len() == 1
        && matches!(&chunks[0].data, Some(sig) if is_canonical_script_signature(sig))
}

/// Check whether a chunk is an acceptable multisig signature slot.
///
/// With `allow_incomplete`, an OP_0 placeholder stands in for a missing
/// signature.
fn is_partial_signature(chunk: &ScriptChunk, allow_incomplete: bool) -> bool {
    match &chunk.data {
        Some(sig) => is_canonical_script_signature(sig),
        None => allow_incomplete && chunk.op == OP_0,
    }
}

/// Match `OP_0 <signature>...` (bare multisig scriptSig).
pub fn is_p2ms_input(chunks: &[ScriptChunk], allow_incomplete: bool) -> bool {
    if chunks.len() < 2 {
        return false;
    }
    if chunks[0].op != OP_0 || chunks[0].data.is_some() {
        return false;
    }
    chunks[1..]
        .iter()
        .all(|chunk| is_partial_signature(chunk, allow_incomplete))
}

/// Match `[...redeemScriptSig] {redeemScript}` (P2SH scriptSig).
///
/// The last chunk must be a push whose payload is itself a valid script;
/// everything before it must be push-only and match the input template of
/// the redeem script's own output type.
pub fn is_p2sh_input(chunks: &[ScriptChunk], allow_incomplete: bool) -> bool {
    if chunks.is_empty() {
        return false;
    }
    let redeem_script = match &chunks[chunks.len() - 1].data {
        Some(data) => data,
        None => return false,
    };
    let redeem_chunks = match decode_script(redeem_script) {
        Ok(parsed) if !parsed.is_empty() => parsed,
        _ => return false,
    };

    let sig_chunks = &chunks[..chunks.len() - 1];
    if !is_push_only(sig_chunks) {
        return false;
    }

    // A scriptSig holding only the redeem script: a witness program is
    // being revealed, with the real unlocking data in the witness.
    if chunks.len() == 1 {
        let compiled = match crate::chunk::compile_chunks(&redeem_chunks) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        return is_p2wsh_output(&compiled) || is_p2wpkh_output(&compiled);
    }

    (is_p2pkh_input(sig_chunks) && is_p2pkh_output_chunks(&redeem_chunks))
        || (is_p2ms_input(sig_chunks, allow_incomplete) && is_p2ms_output(&redeem_chunks, true))
        || (is_p2pk_input(sig_chunks) && is_p2pk_output(&redeem_chunks))
}

/// P2PKH output check over chunks, used when the compiled form is not at
/// hand.
fn is_p2pkh_output_chunks(chunks: &[ScriptChunk]) -> bool {
    chunks.len() == 5
        && chunks[0].op == OP_DUP
        && chunks[1].op == OP_HASH160
        && matches!(&chunks[2].data, Some(hash) if hash.len() == 20)
        && chunks[3].op == OP_EQUALVERIFY
        && chunks[4].op == OP_CHECKSIG
}

// ---------------------------------------------------------------------------
// Witness matchers
// ---------------------------------------------------------------------------

/// Match a P2WPKH witness: `[signature, compressed pubkey]`.
pub fn is_p2wpkh_witness(stack: &[Vec<u8>]) -> bool {
    stack.len() == 2
        && is_canonical_script_signature(&stack[0])
        && is_compressed_canonical_pubkey(&stack[1])
}

/// Match a P2WSH witness: `[...stack items] {witnessScript}`.
///
/// The last element must be a valid non-empty script whose own output
/// type matches the remaining stack items when they are read as an
/// unlocking template.
pub fn is_p2wsh_witness(stack: &[Vec<u8>], allow_incomplete: bool) -> bool {
    if stack.is_empty() {
        return false;
    }
    let witness_script = &stack[stack.len() - 1];
    let script_chunks = match decode_script(witness_script) {
        Ok(parsed) if !parsed.is_empty() => parsed,
        _ => return false,
    };

    // The remaining items map onto scriptSig chunks: empty items play the
    // role of OP_0 placeholders.
    let sig_chunks: Vec<ScriptChunk> = stack[..stack.len() - 1]
        .iter()
        .map(|item| {
            if item.is_empty() {
                ScriptChunk::op(OP_0)
            } else {
                ScriptChunk::push(item.clone())
            }
        })
        .collect();

    (is_p2pkh_input(&sig_chunks) && is_p2pkh_output_chunks(&script_chunks))
        || (is_p2ms_input(&sig_chunks, allow_incomplete) && is_p2ms_output(&script_chunks, true))
        || (is_p2pk_input(&sig_chunks) && is_p2pk_output(&script_chunks))
}

// ---------------------------------------------------------------------------
// Classification entry points
// ---------------------------------------------------------------------------

/// Classify an output (locking) script.
///
/// Tries the four buffer-matchable templates first, then decompiles once
/// for the chunk-based ones. Returns `NonStandard` when nothing matches.
///
/// # Arguments
/// * `script` - The output script.
///
/// # Returns
/// The matched `ScriptType`, or `InvalidScript` if the buffer cannot be
/// decompiled.
pub fn classify_output(script: &Script) -> Result<ScriptType, ScriptError> {
    let buffer = script.to_bytes();
    if is_p2wpkh_output(buffer) {
        return Ok(ScriptType::P2wpkh);
    }
    if is_p2wsh_output(buffer) {
        return Ok(ScriptType::P2wsh);
    }
    if is_p2pkh_output(buffer) {
        return Ok(ScriptType::P2pkh);
    }
    if is_p2sh_output(buffer) {
        return Ok(ScriptType::P2sh);
    }

    let chunks = decode_script(buffer)
        .map_err(|_| ScriptError::InvalidScript("undecodable output script".to_string()))?;
    if is_p2ms_output(&chunks, false) {
        return Ok(ScriptType::P2ms);
    }
    if is_p2pk_output(&chunks) {
        return Ok(ScriptType::P2pk);
    }
    if is_witness_commitment_output(buffer) {
        return Ok(ScriptType::WitnessCommitment);
    }
    if is_null_data_output(buffer) {
        return Ok(ScriptType::NullData);
    }
    Ok(ScriptType::NonStandard)
}

/// Classify an input (unlocking) script.
///
/// # Arguments
/// * `script` - The scriptSig.
/// * `allow_incomplete` - Accept OP_0 placeholder signature slots in the
///   multisig and script-hash matchers.
///
/// # Returns
/// The matched `ScriptType`, or `InvalidScript` if the buffer cannot be
/// decompiled.
pub fn classify_input(
    script: &Script,
    allow_incomplete: bool,
) -> Result<ScriptType, ScriptError> {
    let chunks = decode_script(script.to_bytes())
        .map_err(|_| ScriptError::InvalidScript("undecodable input script".to_string()))?;
    if is_p2pkh_input(&chunks) {
        return Ok(ScriptType::P2pkh);
    }
    if is_p2sh_input(&chunks, allow_incomplete) {
        return Ok(ScriptType::P2sh);
    }
    if is_p2ms_input(&chunks, allow_incomplete) {
        return Ok(ScriptType::P2ms);
    }
    if is_p2pk_input(&chunks) {
        return Ok(ScriptType::P2pk);
    }
    Ok(ScriptType::NonStandard)
}

/// Classify a witness stack.
///
/// # Arguments
/// * `stack` - The witness stack elements, bottom first.
/// * `allow_incomplete` - Accept empty placeholder signature slots.
///
/// # Returns
/// The matched `ScriptType`; `NonStandard` when nothing matches.
pub fn classify_witness(stack: &[Vec<u8>], allow_incomplete: bool) -> ScriptType {
    if is_p2wpkh_witness(stack) {
        return ScriptType::P2wpkh;
    }
    if is_p2wsh_witness(stack, allow_incomplete) {
        return ScriptType::P2wsh;
    }
    ScriptType::NonStandard
}

#[cfg(test)]
mod tests {
    //! Tests for the script classifier: each template's output and input
    //! matchers, priority order, and totality on unmatched scripts.

    use super::*;
    use crate::signature;

    /// A canonical compressed public key (the generator point).
    const PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    /// A second canonical compressed public key (2G).
    const PUBKEY2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    /// Produce a valid wire signature (DER plus SIGHASH_ALL byte).
    fn wire_signature() -> Vec<u8> {
        let mut sig = [0u8; 64];
        for (i, b) in sig.iter_mut().enumerate() {
            *b = ((i as u8) % 0x7f) + 1;
        }
        signature::encode(&sig, 0x01).expect("valid signature")
    }

    // -----------------------------------------------------------------------
    // Output classification
    // -----------------------------------------------------------------------

    /// Verify each canonical output template classifies to its type.
    #[test]
    fn test_classify_output_templates() {
        let cases = [
            (
                "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac",
                ScriptType::P2pkh,
            ),
            ("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87", ScriptType::P2sh),
            ("0014e2a623699e81b291c0327f408fea765d534baa2a", ScriptType::P2wpkh),
            (
                "0020e2a623699e81b291c0327f408fea765d534baa2ae2a623699e81b291c0327f40",
                ScriptType::P2wsh,
            ),
        ];
        for (hex_str, expected) in cases {
            let script = Script::from_hex(hex_str).expect("valid hex");
            assert_eq!(
                classify_output(&script).expect("classifies"),
                expected,
                "for {}",
                hex_str
            );
        }
    }

    /// Verify P2PK output classification with a real curve point.
    #[test]
    fn test_classify_output_p2pk() {
        let mut script = Script::new();
        script
            .append_push_data(&hex::decode(PUBKEY).expect("valid hex"))
            .expect("push");
        script.append_opcodes(&[OP_CHECKSIG]).expect("opcode");
        assert_eq!(classify_output(&script).expect("classifies"), ScriptType::P2pk);
    }

    /// Verify a 1-of-2 bare multisig output classifies as P2MS.
    #[test]
    fn test_classify_output_p2ms() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_1]).expect("opcode");
        script
            .append_push_data(&hex::decode(PUBKEY).expect("valid hex"))
            .expect("push");
        script
            .append_push_data(&hex::decode(PUBKEY2).expect("valid hex"))
            .expect("push");
        script.append_opcodes(&[OP_2, OP_CHECKMULTISIG]).expect("opcodes");
        assert_eq!(classify_output(&script).expect("classifies"), ScriptType::P2ms);
    }

    /// Verify null-data and witness-commitment outputs classify correctly,
    /// in that priority order.
    #[test]
    fn test_classify_output_op_return() {
        let script = Script::from_hex("6a04deadbeef").expect("valid hex");
        assert_eq!(
            classify_output(&script).expect("classifies"),
            ScriptType::NullData
        );

        let mut commitment = vec![OP_RETURN, 0x24, 0xaa, 0x21, 0xa9, 0xed];
        commitment.extend_from_slice(&[0u8; 32]);
        let script = Script::from_bytes(&commitment);
        assert_eq!(
            classify_output(&script).expect("classifies"),
            ScriptType::WitnessCommitment
        );
    }

    /// Verify unmatched scripts return NonStandard, never an error.
    #[test]
    fn test_classify_output_nonstandard() {
        let script = Script::from_asm("OP_DUP OP_DROP").expect("valid ASM");
        assert_eq!(
            classify_output(&script).expect("classifies"),
            ScriptType::NonStandard
        );
    }

    /// Verify an undecodable buffer raises InvalidScript.
    #[test]
    fn test_classify_output_invalid() {
        // Push of 5 bytes with only 2 present.
        let script = Script::from_bytes(&[0x05, 0x01, 0x02]);
        assert!(classify_output(&script).is_err());
    }

    // -----------------------------------------------------------------------
    // Input classification
    // -----------------------------------------------------------------------

    /// Verify `<sig> <pubkey>` classifies as a P2PKH input.
    #[test]
    fn test_classify_input_p2pkh() {
        let mut script = Script::new();
        script.append_push_data(&wire_signature()).expect("push");
        script
            .append_push_data(&hex::decode(PUBKEY).expect("valid hex"))
            .expect("push");
        assert_eq!(
            classify_input(&script, false).expect("classifies"),
            ScriptType::P2pkh
        );
    }

    /// Verify `<sig>` alone classifies as a P2PK input.
    #[test]
    fn test_classify_input_p2pk() {
        let mut script = Script::new();
        script.append_push_data(&wire_signature()).expect("push");
        assert_eq!(
            classify_input(&script, false).expect("classifies"),
            ScriptType::P2pk
        );
    }

    /// Verify `OP_0 <sig> <sig>` classifies as a multisig input, and that
    /// placeholders require allow_incomplete.
    #[test]
    fn test_classify_input_p2ms() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_0]).expect("opcode");
        script.append_push_data(&wire_signature()).expect("push");
        script.append_push_data(&wire_signature()).expect("push");
        assert_eq!(
            classify_input(&script, false).expect("classifies"),
            ScriptType::P2ms
        );

        let mut partial = Script::new();
        partial.append_opcodes(&[OP_0, OP_0]).expect("opcodes");
        partial.append_push_data(&wire_signature()).expect("push");
        assert_eq!(
            classify_input(&partial, true).expect("classifies"),
            ScriptType::P2ms
        );
        assert_eq!(
            classify_input(&partial, false).expect("classifies"),
            ScriptType::NonStandard
        );
    }

    /// Verify a P2SH input (multisig redeem) classifies as P2SH.
    #[test]
    fn test_classify_input_p2sh() {
        // Redeem script: 1-of-1 multisig.
        let mut redeem = Script::new();
        redeem.append_opcodes(&[OP_1]).expect("opcode");
        redeem
            .append_push_data(&hex::decode(PUBKEY).expect("valid hex"))
            .expect("push");
        redeem.append_opcodes(&[OP_1, OP_CHECKMULTISIG]).expect("opcodes");

        let mut script = Script::new();
        script.append_opcodes(&[OP_0]).expect("opcode");
        script.append_push_data(&wire_signature()).expect("push");
        script.append_push_data(redeem.to_bytes()).expect("push");
        assert_eq!(
            classify_input(&script, false).expect("classifies"),
            ScriptType::P2sh
        );
    }

    // -----------------------------------------------------------------------
    // Witness classification
    // -----------------------------------------------------------------------

    /// Verify `[sig, compressed pubkey]` classifies as a P2WPKH witness.
    #[test]
    fn test_classify_witness_p2wpkh() {
        let stack = vec![wire_signature(), hex::decode(PUBKEY).expect("valid hex")];
        assert_eq!(classify_witness(&stack, false), ScriptType::P2wpkh);
    }

    /// Verify a multisig witness stack classifies as P2WSH.
    #[test]
    fn test_classify_witness_p2wsh() {
        let mut witness_script = Script::new();
        witness_script.append_opcodes(&[OP_1]).expect("opcode");
        witness_script
            .append_push_data(&hex::decode(PUBKEY).expect("valid hex"))
            .expect("push");
        witness_script
            .append_opcodes(&[OP_1, OP_CHECKMULTISIG])
            .expect("opcodes");

        let stack = vec![
            Vec::new(),
            wire_signature(),
            witness_script.to_bytes().to_vec(),
        ];
        assert_eq!(classify_witness(&stack, false), ScriptType::P2wsh);
    }

    /// Verify an empty or unmatched stack classifies as NonStandard.
    #[test]
    fn test_classify_witness_nonstandard() {
        assert_eq!(classify_witness(&[], false), ScriptType::NonStandard);
        let stack = vec![vec![0x01, 0x02]];
        assert_eq!(classify_witness(&stack, false), ScriptType::NonStandard);
    }

    // -----------------------------------------------------------------------
    // Canonical element predicates
    // -----------------------------------------------------------------------

    /// Verify pubkey canonicality checks shapes and curve membership.
    #[test]
    fn test_is_canonical_pubkey() {
        let compressed = hex::decode(PUBKEY).expect("valid hex");
        assert!(is_canonical_pubkey(&compressed));
        assert!(is_compressed_canonical_pubkey(&compressed));

        // Right shape, but x is the field prime: not a valid coordinate.
        let off_curve = hex::decode(
            "02fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        )
        .expect("valid hex");
        assert!(!is_canonical_pubkey(&off_curve));

        // Wrong length.
        assert!(!is_canonical_pubkey(&compressed[..32]));
        // Wrong prefix.
        let mut bad_prefix = compressed;
        bad_prefix[0] = 0x05;
        assert!(!is_canonical_pubkey(&bad_prefix));
    }
}
