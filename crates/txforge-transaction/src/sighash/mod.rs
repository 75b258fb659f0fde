//! Signature hash computation for transaction signing.
//!
//! Two distinct algorithms produce the hash that ECDSA signs to
//! authorize an input: the legacy clone-and-blank scheme, and the BIP143
//! scheme used for witness v0 inputs, which commits to the spent value
//! and hashes shared data once.

use txforge_primitives::hash::sha256d;
use txforge_primitives::util::{VarInt, WireWriter};
use txforge_script::chunk::compile_chunks;
use txforge_script::opcodes::OP_CODESEPARATOR;
use txforge_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u8 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u8 = 0x02;

/// Sign all inputs and only the output with the same index as the signed
/// input.
pub const SIGHASH_SINGLE: u8 = 0x03;

/// Combined with another flag: commit only to the current input, allowing
/// more inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Mask applied to extract the base sighash mode (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u8 = 0x1f;

/// The hash returned by the legacy algorithm for an out-of-range
/// SIGHASH_SINGLE input, reproducing the historical consensus quirk.
const ONE: [u8; 32] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1,
];

/// The value marking a blanked output in SIGHASH_SINGLE serialization.
const BLANK_OUTPUT_VALUE: u64 = u64::MAX;

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the legacy signature hash for a given input.
///
/// Clones the transaction, strips every OP_CODESEPARATOR from the script
/// code, blanks the other inputs' scripts, applies the NONE/SINGLE/
/// ANYONECANPAY transforms, and double-hashes the serialization with the
/// 4-byte hash type appended.
///
/// Out-of-range indices reproduce the historical behavior of hashing to
/// the constant 1 instead of failing.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `prev_out_script` - The script being satisfied (scriptCode).
/// * `hash_type` - The sighash flag byte.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_out_script: &Script,
    hash_type: u8,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Ok(ONE);
    }

    // scriptCode: the previous output script minus any OP_CODESEPARATOR.
    let chunks: Vec<_> = prev_out_script
        .chunks()?
        .into_iter()
        .filter(|chunk| !(chunk.data.is_none() && chunk.op == OP_CODESEPARATOR))
        .collect();
    let our_script = Script::from_bytes(&compile_chunks(&chunks)?);

    let mut tx_tmp = tx.clone();
    let base_type = hash_type & SIGHASH_MASK;

    if base_type == SIGHASH_NONE {
        // Wildcard payee: outputs are not committed to at all, and the
        // other inputs' sequences are blanked.
        tx_tmp.outputs.clear();
        for (i, input) in tx_tmp.inputs.iter_mut().enumerate() {
            if i != input_index {
                input.sequence = 0;
            }
        }
    } else if base_type == SIGHASH_SINGLE {
        if input_index >= tx.outputs.len() {
            return Ok(ONE);
        }
        // Only the matching output is committed to; earlier outputs are
        // blanked, later ones dropped.
        tx_tmp.outputs.truncate(input_index + 1);
        for output in tx_tmp.outputs.iter_mut().take(input_index) {
            output.value = BLANK_OUTPUT_VALUE;
            output.locking_script = Script::new();
        }
        for (i, input) in tx_tmp.inputs.iter_mut().enumerate() {
            if i != input_index {
                input.sequence = 0;
            }
        }
    }

    if hash_type & SIGHASH_ANYONECANPAY != 0 {
        // Only the signed input remains.
        let mut input = tx_tmp.inputs.swap_remove(input_index);
        input.unlocking_script = our_script;
        tx_tmp.inputs = vec![input];
    } else {
        for input in tx_tmp.inputs.iter_mut() {
            input.unlocking_script = Script::new();
        }
        tx_tmp.inputs[input_index].unlocking_script = our_script;
    }

    // Witness stacks never participate in the legacy algorithm.
    let mut writer = WireWriter::with_capacity(256);
    tx_tmp.write_to(&mut writer, false);
    writer.write_u32_le(hash_type as u32);
    Ok(sha256d(writer.as_bytes()))
}

// -----------------------------------------------------------------------
// BIP143 witness v0 signature hash
// -----------------------------------------------------------------------

/// Compute the BIP143 signature hash for a given witness v0 input.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless
///    ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE) - value of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs, one output, or zero
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - The script code being satisfied.
/// * `value` - The value of the output being spent.
/// * `hash_type` - The sighash flag byte.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn witness_v0_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: u64,
    hash_type: u8,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let input = &tx.inputs[input_index];
    let base_type = hash_type & SIGHASH_MASK;

    let hash_prevouts = if hash_type & SIGHASH_ANYONECANPAY == 0 {
        prevouts_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence = if hash_type & SIGHASH_ANYONECANPAY == 0
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_vout);
    writer.write_varint(VarInt::from(script_code.len()));
    writer.write_bytes(script_code.to_bytes());
    writer.write_u64_le(value);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(hash_type as u32);

    Ok(sha256d(writer.as_bytes()))
}

/// Compute the double-SHA256 of all input outpoints concatenated.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_vout);
    }
    sha256d(writer.as_bytes())
}

/// Compute the double-SHA256 of all input sequence numbers concatenated.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// Compute the double-SHA256 of serialized outputs.
///
/// With `only` set, just the output at that index is included (the
/// SIGHASH_SINGLE case).
fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = WireWriter::new();
    match only {
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
        Some(index) => {
            tx.outputs[index].write_to(&mut writer);
        }
    }
    sha256d(writer.as_bytes())
}

#[cfg(test)]
mod tests {
    //! Tests for the signature hash algorithms against the BIP143
    //! reference vectors and the legacy algorithm's structural behavior.

    use super::*;

    /// The BIP143 "Native P2WPKH" example transaction (unsigned).
    const BIP143_TX: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";

    /// Verify the BIP143 sigvector: hashing input 1 with the P2PKH script
    /// code and value 6 BTC reproduces the published sighash.
    #[test]
    fn test_bip143_native_p2wpkh_vector() {
        let tx = Transaction::from_hex(BIP143_TX).expect("should parse");
        assert_eq!(tx.inputs.len(), 2);

        let script_code =
            Script::from_hex("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac")
                .expect("valid hex");
        let hash = witness_v0_signature_hash(&tx, 1, &script_code, 600_000_000, SIGHASH_ALL)
            .expect("should hash");
        assert_eq!(
            hex::encode(hash),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
    }

    /// Verify an out-of-range input index is rejected for BIP143.
    #[test]
    fn test_bip143_index_out_of_range() {
        let tx = Transaction::from_hex(BIP143_TX).expect("should parse");
        let script_code = Script::new();
        assert!(witness_v0_signature_hash(&tx, 5, &script_code, 0, SIGHASH_ALL).is_err());
    }

    /// Verify the legacy algorithm returns the constant 1 for an
    /// out-of-range SIGHASH_SINGLE output index.
    #[test]
    fn test_legacy_single_out_of_range() {
        let tx = Transaction::from_hex(BIP143_TX).expect("should parse");
        // Input 1 with SIGHASH_SINGLE would need output 1; drop it.
        let mut tx = tx;
        tx.outputs.truncate(1);
        let script = Script::from_hex("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac")
            .expect("valid hex");
        let hash = legacy_signature_hash(&tx, 1, &script, SIGHASH_SINGLE).expect("should hash");
        assert_eq!(hash, super::ONE);
    }

    /// Verify the legacy hash changes with the hash type and input index.
    #[test]
    fn test_legacy_distinct_by_type_and_index() {
        let tx = Transaction::from_hex(BIP143_TX).expect("should parse");
        let script = Script::from_hex("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac")
            .expect("valid hex");

        let all_0 = legacy_signature_hash(&tx, 0, &script, SIGHASH_ALL).expect("hash");
        let all_1 = legacy_signature_hash(&tx, 1, &script, SIGHASH_ALL).expect("hash");
        let none_0 = legacy_signature_hash(&tx, 0, &script, SIGHASH_NONE).expect("hash");
        let acp_0 =
            legacy_signature_hash(&tx, 0, &script, SIGHASH_ALL | SIGHASH_ANYONECANPAY)
                .expect("hash");

        assert_ne!(all_0, all_1);
        assert_ne!(all_0, none_0);
        assert_ne!(all_0, acp_0);
    }

    /// Verify OP_CODESEPARATOR is stripped from the script code: two
    /// scripts differing only by a separator hash identically.
    #[test]
    fn test_legacy_strips_codeseparator() {
        let tx = Transaction::from_hex(BIP143_TX).expect("should parse");
        let plain = Script::from_hex("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac")
            .expect("valid hex");
        let with_sep = Script::from_hex("ab76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac")
            .expect("valid hex");

        let a = legacy_signature_hash(&tx, 0, &plain, SIGHASH_ALL).expect("hash");
        let b = legacy_signature_hash(&tx, 0, &with_sep, SIGHASH_ALL).expect("hash");
        assert_eq!(a, b);
    }
}
