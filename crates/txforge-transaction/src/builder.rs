//! Transaction builder with an incremental signing state machine.
//!
//! The builder owns a transaction skeleton plus one `InputRecord` per
//! input. Records are expanded from previous-output scripts or existing
//! scriptSigs/witness stacks, resolved into a signable state on demand,
//! filled one signature slot at a time, and finally inverted back into
//! scriptSigs and witness stacks at build time. Guards re-evaluated on
//! every mutating call reject changes that would invalidate signatures
//! already committed under their sighash modes.

use std::collections::HashSet;

use txforge_primitives::ec::{PrivateKey, PublicKey, Signature};
use txforge_primitives::hash::hash160;
use txforge_script::address::to_output_script;
use txforge_script::classify::{classify_input, classify_output, classify_witness};
use txforge_script::chunk::ScriptChunk;
use txforge_script::opcodes::OP_0;
use txforge_script::signature as script_signature;
use txforge_script::{Network, Script, ScriptType};

use crate::input::TxInput;
use crate::output::TxOutput;
use crate::payments::{
    P2ms, P2msArgs, P2pk, P2pkArgs, P2pkh, P2pkhArgs, P2sh, P2shArgs, P2wpkh, P2wpkhArgs, P2wsh,
    P2wshArgs, PaymentOpts, RedeemParts,
};
use crate::sighash::{
    SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_MASK, SIGHASH_NONE, SIGHASH_SINGLE,
};
use crate::transaction::Transaction;
use crate::{BuildError, TransactionError};

/// Default absurd-fee ceiling in value units per virtual byte.
///
/// A safety valve against fat-finger fees, not a protocol rule.
const DEFAULT_MAXIMUM_FEE_RATE: u64 = 2500;

// -----------------------------------------------------------------------
// Per-input signing state
// -----------------------------------------------------------------------

/// The signing state of one transaction input.
///
/// Pubkey and signature slots are parallel vectors: `signatures[i]`
/// belongs to `pubkeys[i]`. A `None` slot is unfilled (a pubkey slot may
/// also be unknown, e.g. for a bare pay-to-pubkey scriptSig, which
/// reveals the signature but not the key).
#[derive(Clone, Debug, Default)]
struct InputRecord {
    /// The previous output's locking script.
    prev_out_script: Option<Script>,
    /// Classification of the previous output script.
    prev_out_type: Option<ScriptType>,
    /// The P2SH redeem script, once known.
    redeem_script: Option<Script>,
    /// Classification of the redeem script as an output.
    redeem_script_type: Option<ScriptType>,
    /// The P2WSH witness script, once known.
    witness_script: Option<Script>,
    /// Classification of the witness script as an output.
    witness_script_type: Option<ScriptType>,
    /// The script actually hashed for signing.
    sign_script: Option<Script>,
    /// The innermost real script type being satisfied.
    sign_type: Option<ScriptType>,
    /// Ordered public key slots.
    pubkeys: Option<Vec<Option<Vec<u8>>>>,
    /// Signature slots, parallel to `pubkeys`.
    signatures: Option<Vec<Option<Vec<u8>>>>,
    /// The multisig threshold `m`.
    max_signatures: Option<usize>,
    /// Whether this input signs with the BIP143 algorithm.
    has_witness: bool,
    /// Value of the output being spent; required to sign a witness input.
    value: Option<u64>,
}

/// Check whether a record holds everything `sign` needs.
fn can_sign(record: &InputRecord) -> bool {
    record.sign_script.is_some()
        && record.sign_type.is_some()
        && record
            .pubkeys
            .as_ref()
            .is_some_and(|pubkeys| !pubkeys.is_empty())
        && record
            .signatures
            .as_ref()
            .zip(record.pubkeys.as_ref())
            .is_some_and(|(signatures, pubkeys)| signatures.len() == pubkeys.len())
        && (!record.has_witness || record.value.is_some())
}

/// Read the sighash flag byte off the end of a wire signature.
fn signature_hash_type(signature: &[u8]) -> u8 {
    signature.last().copied().unwrap_or(0)
}

/// Compile a witness stack into a push-only script, empty items becoming
/// OP_0.
fn stack_to_script(stack: &[Vec<u8>]) -> Result<Script, BuildError> {
    let chunks: Vec<ScriptChunk> = stack
        .iter()
        .map(|item| {
            if item.is_empty() {
                ScriptChunk::op(OP_0)
            } else {
                ScriptChunk::push(item.clone())
            }
        })
        .collect();
    Ok(Script::from_chunks(&chunks)?)
}

/// The canonical legacy P2PKH script for a pubkey.
///
/// Witness-pubkey-hash inputs sign this script per BIP143, not the
/// witness program itself.
fn p2pkh_script_code(pubkey: &[u8]) -> Result<Script, BuildError> {
    let payment = P2pkh::new(P2pkhArgs {
        pubkey: Some(pubkey.to_vec()),
        ..Default::default()
    })?;
    payment
        .output()
        .ok_or_else(|| BuildError::UnsupportedPattern("underivable pubkey script".to_string()))
}

// -----------------------------------------------------------------------
// Input expansion
// -----------------------------------------------------------------------

/// Expand an existing scriptSig and witness stack into an `InputRecord`.
///
/// Classifies the unlocking data (preferring `type_hint` when the caller
/// asserts one) and recursively unwraps P2SH/P2WSH one level, recovering
/// the innermost script type, its pubkeys, and any signatures already
/// present. Unrecognized data yields a `NonStandard` record; an empty
/// scriptSig with an empty witness yields an empty record.
fn expand_input(
    script_sig: &Script,
    witness: &[Vec<u8>],
    type_hint: Option<ScriptType>,
    script_pub_key: Option<&Script>,
) -> Result<InputRecord, BuildError> {
    if script_sig.is_empty() && witness.is_empty() {
        return Ok(InputRecord::default());
    }

    let script_type = match type_hint {
        Some(hint) => Some(hint),
        None => match classify_input(script_sig, true)? {
            ScriptType::NonStandard => match classify_witness(witness, true) {
                ScriptType::NonStandard => None,
                witness_type => Some(witness_type),
            },
            script_sig_type => Some(script_sig_type),
        },
    };

    match script_type {
        Some(ScriptType::P2wpkh) => {
            let payment = P2wpkh::new(P2wpkhArgs {
                witness: Some(witness.to_vec()),
                ..Default::default()
            })?;
            Ok(InputRecord {
                prev_out_script: payment.output(),
                prev_out_type: Some(ScriptType::P2wpkh),
                pubkeys: Some(vec![payment.pubkey()]),
                signatures: Some(vec![payment.signature()]),
                ..Default::default()
            })
        }

        Some(ScriptType::P2pkh) => {
            let payment = P2pkh::new(P2pkhArgs {
                input: Some(script_sig.clone()),
                ..Default::default()
            })?;
            Ok(InputRecord {
                prev_out_script: payment.output(),
                prev_out_type: Some(ScriptType::P2pkh),
                pubkeys: Some(vec![payment.pubkey()]),
                signatures: Some(vec![payment.signature()]),
                ..Default::default()
            })
        }

        Some(ScriptType::P2pk) => {
            let payment = P2pk::new(P2pkArgs {
                input: Some(script_sig.clone()),
                ..Default::default()
            })?;
            // The scriptSig reveals only the signature; the key slot
            // stays unknown until the output side supplies it.
            Ok(InputRecord {
                prev_out_type: Some(ScriptType::P2pk),
                pubkeys: Some(vec![None]),
                signatures: Some(vec![payment.signature()]),
                ..Default::default()
            })
        }

        Some(ScriptType::P2ms) => {
            let payment = P2ms::with_opts(
                P2msArgs {
                    input: Some(script_sig.clone()),
                    output: script_pub_key.cloned(),
                    ..Default::default()
                },
                &PaymentOpts {
                    validate: true,
                    allow_incomplete: true,
                },
            )?;
            Ok(InputRecord {
                prev_out_type: Some(ScriptType::P2ms),
                pubkeys: payment
                    .pubkeys()
                    .map(|pubkeys| pubkeys.into_iter().map(Some).collect()),
                signatures: payment.signatures(),
                max_signatures: payment.m(),
                ..Default::default()
            })
        }

        Some(ScriptType::P2sh) => {
            let payment = P2sh::new(P2shArgs {
                input: Some(script_sig.clone()),
                witness: if witness.is_empty() {
                    None
                } else {
                    Some(witness.to_vec())
                },
                ..Default::default()
            })?;
            let redeem = payment.redeem().ok_or_else(|| {
                BuildError::UnsupportedPattern("script-hash input without redeem".to_string())
            })?;
            let redeem_output = redeem.output.clone().ok_or_else(|| {
                BuildError::UnsupportedPattern("script-hash input without redeem".to_string())
            })?;

            let output_type = classify_output(&redeem_output)?;
            let redeem_input = redeem.input.clone().unwrap_or_default();
            let redeem_witness = redeem.witness.clone().unwrap_or_default();
            let expanded = expand_input(
                &redeem_input,
                &redeem_witness,
                Some(output_type),
                Some(&redeem_output),
            )?;
            if expanded.prev_out_type.is_none() {
                return Ok(InputRecord::default());
            }

            Ok(InputRecord {
                prev_out_script: payment.output(),
                prev_out_type: Some(ScriptType::P2sh),
                redeem_script: Some(redeem_output),
                redeem_script_type: expanded.prev_out_type,
                witness_script: expanded.witness_script,
                witness_script_type: expanded.witness_script_type,
                pubkeys: expanded.pubkeys,
                signatures: expanded.signatures,
                ..Default::default()
            })
        }

        Some(ScriptType::P2wsh) => {
            let payment = P2wsh::new(P2wshArgs {
                witness: Some(witness.to_vec()),
                ..Default::default()
            })?;
            let redeem = payment.redeem().ok_or_else(|| {
                BuildError::UnsupportedPattern("witness-script-hash input without redeem".to_string())
            })?;
            let redeem_output = redeem.output.clone().ok_or_else(|| {
                BuildError::UnsupportedPattern("witness-script-hash input without redeem".to_string())
            })?;

            let output_type = classify_output(&redeem_output)?;
            let redeem_witness = redeem.witness.clone().unwrap_or_default();
            let expanded = if output_type == ScriptType::P2wpkh {
                let redeem_input = redeem.input.clone().unwrap_or_default();
                expand_input(&redeem_input, &redeem_witness, Some(output_type), None)?
            } else {
                // Inner stack items play the role of scriptSig pushes.
                let inner_script = stack_to_script(&redeem_witness)?;
                expand_input(&inner_script, &[], Some(output_type), Some(&redeem_output))?
            };
            if expanded.prev_out_type.is_none() {
                return Ok(InputRecord::default());
            }

            Ok(InputRecord {
                prev_out_script: payment.output(),
                prev_out_type: Some(ScriptType::P2wsh),
                witness_script: Some(redeem_output),
                witness_script_type: expanded.prev_out_type,
                pubkeys: expanded.pubkeys,
                signatures: expanded.signatures,
                ..Default::default()
            })
        }

        _ => Ok(InputRecord {
            prev_out_type: Some(ScriptType::NonStandard),
            ..Default::default()
        }),
    }
}

// -----------------------------------------------------------------------
// Output expansion
// -----------------------------------------------------------------------

/// What a previous output script implies for signing.
struct OutputExpansion {
    /// Classification of the output script.
    script_type: ScriptType,
    /// Pubkey slots, when the type carries them.
    pubkeys: Option<Vec<Option<Vec<u8>>>>,
    /// Empty signature slots sized to match.
    signatures: Option<Vec<Option<Vec<u8>>>>,
    /// The multisig threshold, for bare multisig outputs.
    max_signatures: Option<usize>,
}

impl OutputExpansion {
    /// An expansion that recovered only the type.
    fn bare(script_type: ScriptType) -> Self {
        OutputExpansion {
            script_type,
            pubkeys: None,
            signatures: None,
            max_signatures: None,
        }
    }
}

/// Expand a previous output script into pubkey and signature slots.
///
/// Types carrying an implicit pubkey populate the slots: hash-based
/// patterns only when `our_pubkey` hashes to the committed value, bare
/// pay-to-pubkey and multisig from the script itself.
fn expand_output(
    script: &Script,
    our_pubkey: Option<&[u8]>,
) -> Result<OutputExpansion, BuildError> {
    let script_type = classify_output(script)?;

    match script_type {
        ScriptType::P2pkh | ScriptType::P2wpkh => {
            let our_pubkey = match our_pubkey {
                Some(pubkey) => pubkey,
                None => return Ok(OutputExpansion::bare(script_type)),
            };
            let committed = if script_type == ScriptType::P2pkh {
                P2pkh::new(P2pkhArgs {
                    output: Some(script.clone()),
                    ..Default::default()
                })?
                .hash()
            } else {
                P2wpkh::new(P2wpkhArgs {
                    output: Some(script.clone()),
                    ..Default::default()
                })?
                .hash()
            };
            if committed != Some(hash160(our_pubkey)) {
                return Ok(OutputExpansion::bare(script_type));
            }
            Ok(OutputExpansion {
                script_type,
                pubkeys: Some(vec![Some(our_pubkey.to_vec())]),
                signatures: Some(vec![None]),
                max_signatures: None,
            })
        }

        ScriptType::P2pk => {
            let payment = P2pk::new(P2pkArgs {
                output: Some(script.clone()),
                ..Default::default()
            })?;
            Ok(OutputExpansion {
                script_type,
                pubkeys: Some(vec![payment.pubkey()]),
                signatures: Some(vec![None]),
                max_signatures: None,
            })
        }

        ScriptType::P2ms => {
            let payment = P2ms::new(P2msArgs {
                output: Some(script.clone()),
                ..Default::default()
            })?;
            let pubkeys: Vec<Option<Vec<u8>>> = payment
                .pubkeys()
                .unwrap_or_default()
                .into_iter()
                .map(Some)
                .collect();
            let slots = vec![None; pubkeys.len()];
            Ok(OutputExpansion {
                script_type,
                pubkeys: Some(pubkeys),
                signatures: Some(slots),
                max_signatures: payment.m(),
            })
        }

        _ => Ok(OutputExpansion::bare(script_type)),
    }
}

// -----------------------------------------------------------------------
// Input preparation
// -----------------------------------------------------------------------

/// Preserve a record's existing signatures over freshly sized slots.
fn keep_existing_signatures(
    record: &InputRecord,
    fresh: Option<Vec<Option<Vec<u8>>>>,
) -> Option<Vec<Option<Vec<u8>>>> {
    if record
        .signatures
        .as_ref()
        .is_some_and(|slots| slots.iter().any(|slot| slot.is_some()))
    {
        record.signatures.clone()
    } else {
        fresh
    }
}

/// Resolve a record into a signable state.
///
/// Verifies any supplied redeem/witness script against the recorded
/// previous output, rejects witness-pubkey-hash nested below another
/// witness program, chooses the script to hash for signing (the BIP143
/// P2PKH script code for witness-pubkey-hash), and preserves signatures
/// already present on the record.
fn prepare_input(
    record: &mut InputRecord,
    our_pubkey: &[u8],
    redeem_script: Option<&Script>,
    witness_script: Option<&Script>,
) -> Result<(), BuildError> {
    if let (Some(redeem), Some(witness)) = (redeem_script, witness_script) {
        // P2SH(P2WSH(...)): the redeem script must itself be the P2WSH
        // program of the witness script.
        let p2wsh = P2wsh::new(P2wshArgs {
            redeem: Some(RedeemParts {
                output: Some(witness.clone()),
                ..Default::default()
            }),
            ..Default::default()
        })?;
        let p2wsh_alt = P2wsh::new(P2wshArgs {
            output: Some(redeem.clone()),
            ..Default::default()
        })?;
        if p2wsh.hash() != p2wsh_alt.hash() {
            return Err(BuildError::WitnessScriptMismatch);
        }

        let p2sh = P2sh::new(P2shArgs {
            redeem: Some(RedeemParts {
                output: Some(redeem.clone()),
                ..Default::default()
            }),
            ..Default::default()
        })?;
        let p2sh_alt = P2sh::new(P2shArgs {
            redeem: Some(RedeemParts {
                output: p2wsh.output(),
                ..Default::default()
            }),
            ..Default::default()
        })?;
        if p2sh.hash() != p2sh_alt.hash() {
            return Err(BuildError::RedeemScriptMismatch);
        }

        let expanded = expand_output(witness, Some(our_pubkey))?;
        let pubkeys = expanded.pubkeys.ok_or_else(|| {
            BuildError::UnsupportedPattern(format!(
                "{} not supported as witness script",
                expanded.script_type
            ))
        })?;
        if expanded.script_type == ScriptType::P2wpkh {
            return Err(BuildError::UnsupportedPattern(
                "P2SH(P2WSH(P2WPKH)) is a consensus failure".to_string(),
            ));
        }

        record.signatures = keep_existing_signatures(record, expanded.signatures);
        record.redeem_script = Some(redeem.clone());
        record.redeem_script_type = Some(ScriptType::P2wsh);
        record.witness_script = Some(witness.clone());
        record.witness_script_type = Some(expanded.script_type);
        record.prev_out_type = Some(ScriptType::P2sh);
        record.prev_out_script = p2sh.output();
        record.has_witness = true;
        record.sign_script = Some(witness.clone());
        record.sign_type = Some(expanded.script_type);
        record.pubkeys = Some(pubkeys);
        record.max_signatures = expanded.max_signatures;
        return Ok(());
    }

    if let Some(redeem) = redeem_script {
        let p2sh = P2sh::new(P2shArgs {
            redeem: Some(RedeemParts {
                output: Some(redeem.clone()),
                ..Default::default()
            }),
            ..Default::default()
        })?;

        if let Some(prev_out_script) = &record.prev_out_script {
            let p2sh_alt = P2sh::new(P2shArgs {
                output: Some(prev_out_script.clone()),
                ..Default::default()
            })
            .map_err(|_| BuildError::PrevOutNotP2sh)?;
            if p2sh.hash() != p2sh_alt.hash() {
                return Err(BuildError::RedeemScriptMismatch);
            }
        }

        let expanded = expand_output(redeem, Some(our_pubkey))?;
        let pubkeys = expanded.pubkeys.ok_or_else(|| {
            BuildError::UnsupportedPattern(format!(
                "{} not supported as redeem script",
                expanded.script_type
            ))
        })?;

        let sign_script = if expanded.script_type == ScriptType::P2wpkh {
            let pubkey = pubkeys.first().and_then(|slot| slot.clone()).ok_or_else(|| {
                BuildError::UnsupportedPattern(
                    "witness-pubkey-hash redeem without a pubkey".to_string(),
                )
            })?;
            p2pkh_script_code(&pubkey)?
        } else {
            redeem.clone()
        };

        record.signatures = keep_existing_signatures(record, expanded.signatures);
        record.redeem_script = Some(redeem.clone());
        record.redeem_script_type = Some(expanded.script_type);
        record.prev_out_type = Some(ScriptType::P2sh);
        record.prev_out_script = p2sh.output();
        record.has_witness = expanded.script_type == ScriptType::P2wpkh;
        record.sign_script = Some(sign_script);
        record.sign_type = Some(expanded.script_type);
        record.pubkeys = Some(pubkeys);
        record.max_signatures = expanded.max_signatures;
        return Ok(());
    }

    if let Some(witness) = witness_script {
        let p2wsh = P2wsh::new(P2wshArgs {
            redeem: Some(RedeemParts {
                output: Some(witness.clone()),
                ..Default::default()
            }),
            ..Default::default()
        })?;

        if let Some(prev_out_script) = &record.prev_out_script {
            let p2wsh_alt = P2wsh::new(P2wshArgs {
                output: Some(prev_out_script.clone()),
                ..Default::default()
            })?;
            if p2wsh.hash() != p2wsh_alt.hash() {
                return Err(BuildError::WitnessScriptMismatch);
            }
        }

        let expanded = expand_output(witness, Some(our_pubkey))?;
        let pubkeys = expanded.pubkeys.ok_or_else(|| {
            BuildError::UnsupportedPattern(format!(
                "{} not supported as witness script",
                expanded.script_type
            ))
        })?;
        if expanded.script_type == ScriptType::P2wpkh {
            return Err(BuildError::UnsupportedPattern(
                "P2WSH(P2WPKH) is a consensus failure".to_string(),
            ));
        }

        record.signatures = keep_existing_signatures(record, expanded.signatures);
        record.witness_script = Some(witness.clone());
        record.witness_script_type = Some(expanded.script_type);
        record.prev_out_type = Some(ScriptType::P2wsh);
        record.prev_out_script = p2wsh.output();
        record.has_witness = true;
        record.sign_script = Some(witness.clone());
        record.sign_type = Some(expanded.script_type);
        record.pubkeys = Some(pubkeys);
        record.max_signatures = expanded.max_signatures;
        return Ok(());
    }

    if let (Some(prev_out_type), Some(prev_out_script)) =
        (record.prev_out_type, record.prev_out_script.clone())
    {
        // Embedded scripts cannot be resolved without the script itself.
        if prev_out_type == ScriptType::P2sh {
            return Err(BuildError::RedeemScriptRequired(prev_out_type));
        }
        if prev_out_type == ScriptType::P2wsh {
            return Err(BuildError::WitnessScriptRequired(prev_out_type));
        }

        let expanded = expand_output(&prev_out_script, Some(our_pubkey))?;
        let pubkeys = expanded.pubkeys.ok_or_else(|| {
            BuildError::UnsupportedPattern(format!("{} not supported", expanded.script_type))
        })?;

        let sign_script = if expanded.script_type == ScriptType::P2wpkh {
            let pubkey = pubkeys.first().and_then(|slot| slot.clone()).ok_or_else(|| {
                BuildError::UnsupportedPattern(
                    "witness-pubkey-hash output without a pubkey".to_string(),
                )
            })?;
            p2pkh_script_code(&pubkey)?
        } else {
            prev_out_script.clone()
        };

        record.signatures = keep_existing_signatures(record, expanded.signatures);
        record.prev_out_type = Some(expanded.script_type);
        record.prev_out_script = Some(prev_out_script);
        record.has_witness = expanded.script_type == ScriptType::P2wpkh;
        record.sign_script = Some(sign_script);
        record.sign_type = Some(expanded.script_type);
        record.pubkeys = Some(pubkeys);
        record.max_signatures = expanded.max_signatures;
        return Ok(());
    }

    // Nothing known about the previous output: assume it pays to our key.
    let prev_out_script = p2pkh_script_code(our_pubkey)?;
    record.prev_out_type = Some(ScriptType::P2pkh);
    record.prev_out_script = Some(prev_out_script.clone());
    record.has_witness = false;
    record.sign_script = Some(prev_out_script);
    record.sign_type = Some(ScriptType::P2pkh);
    record.pubkeys = Some(vec![Some(our_pubkey.to_vec())]);
    record.signatures = Some(vec![None]);
    Ok(())
}

// -----------------------------------------------------------------------
// Multisig signature reordering
// -----------------------------------------------------------------------

/// Re-associate imported multisig signatures with the pubkeys they
/// verify against.
///
/// A serialized multisig scriptSig carries no positional metadata, so an
/// import with fewer signatures than pubkeys loses the alignment. Each
/// signature is re-verified (recomputing the legacy sighash under its
/// own flag) against the pubkeys in order; the first eligible unmatched
/// signature wins, and one that verifies against no remaining pubkey is
/// dropped.
fn fix_multisig_order(
    record: &mut InputRecord,
    transaction: &Transaction,
    vin: usize,
) -> Result<(), BuildError> {
    if record.redeem_script_type != Some(ScriptType::P2ms) {
        return Ok(());
    }
    let redeem_script = match &record.redeem_script {
        Some(script) => script.clone(),
        None => return Ok(()),
    };
    let (pubkeys, signatures) = match (&record.pubkeys, &record.signatures) {
        (Some(pubkeys), Some(signatures)) => (pubkeys.clone(), signatures.clone()),
        _ => return Ok(()),
    };
    if pubkeys.len() == signatures.len() {
        return Ok(());
    }

    let mut unmatched = signatures;
    let mut reordered: Vec<Option<Vec<u8>>> = Vec::with_capacity(pubkeys.len());
    for pubkey_slot in &pubkeys {
        let mut matched = None;
        if let Some(pubkey_bytes) = pubkey_slot {
            let pubkey = PublicKey::from_bytes(pubkey_bytes)?;
            for slot in unmatched.iter_mut() {
                let Some(candidate) = slot.as_ref() else { continue };
                let parsed = script_signature::decode(candidate)?;
                let hash =
                    transaction.hash_for_signature(vin, &redeem_script, parsed.hash_type)?;
                let signature = Signature::from_compact(&parsed.signature)?;
                if !pubkey.verify(&hash, &signature) {
                    continue;
                }
                matched = slot.take();
                break;
            }
        }
        reordered.push(matched);
    }
    record.signatures = Some(reordered);
    Ok(())
}

// -----------------------------------------------------------------------
// Script assembly (template inversion)
// -----------------------------------------------------------------------

/// The scripts a record's accumulated state can produce.
struct AssembledScripts {
    /// The locking script the unlocking data satisfies, when derivable.
    output: Option<Script>,
    /// The assembled scriptSig.
    input: Option<Script>,
    /// The assembled witness stack.
    witness: Option<Vec<Vec<u8>>>,
}

/// Invert the template for a record's type, recursively re-wrapping
/// P2SH/P2WSH.
///
/// Returns `None` when the record lacks the material to derive anything
/// (in an incremental build the input is then left empty).
fn assemble_input(
    script_type: Option<ScriptType>,
    record: &InputRecord,
    allow_incomplete: bool,
) -> Result<Option<AssembledScripts>, BuildError> {
    let pubkeys = record.pubkeys.clone().unwrap_or_default();
    let signatures = record.signatures.clone().unwrap_or_default();

    match script_type {
        Some(ScriptType::P2pkh) => {
            if pubkeys.is_empty() || signatures.is_empty() || signatures[0].is_none() {
                return Ok(None);
            }
            let payment = P2pkh::new(P2pkhArgs {
                pubkey: pubkeys[0].clone(),
                signature: signatures[0].clone(),
                ..Default::default()
            })?;
            Ok(Some(AssembledScripts {
                output: payment.output(),
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        Some(ScriptType::P2wpkh) => {
            if pubkeys.is_empty() || signatures.is_empty() || signatures[0].is_none() {
                return Ok(None);
            }
            let payment = P2wpkh::new(P2wpkhArgs {
                pubkey: pubkeys[0].clone(),
                signature: signatures[0].clone(),
                ..Default::default()
            })?;
            Ok(Some(AssembledScripts {
                output: payment.output(),
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        Some(ScriptType::P2pk) => {
            if pubkeys.is_empty() || signatures.is_empty() || signatures[0].is_none() {
                return Ok(None);
            }
            let payment = P2pk::new(P2pkArgs {
                signature: signatures[0].clone(),
                ..Default::default()
            })?;
            Ok(Some(AssembledScripts {
                output: None,
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        Some(ScriptType::P2ms) => {
            let m = match record.max_signatures {
                Some(m) => m,
                None => return Ok(None),
            };
            let known_pubkeys: Option<Vec<Vec<u8>>> = pubkeys.into_iter().collect();

            let slots: Vec<Option<Vec<u8>>> = if allow_incomplete {
                // Placeholder zero-pushes preserve slot positions.
                signatures
            } else {
                signatures.into_iter().filter(|slot| slot.is_some()).collect()
            };
            if !allow_incomplete && slots.len() < m {
                return Ok(None);
            }
            // Strict validation only once the filled count reaches the
            // threshold; an incomplete script may carry more placeholders
            // than m.
            let validate = !allow_incomplete || slots.len() == m;

            let payment = P2ms::with_opts(
                P2msArgs {
                    m: Some(m),
                    pubkeys: known_pubkeys,
                    signatures: Some(slots),
                    ..Default::default()
                },
                &PaymentOpts {
                    validate,
                    allow_incomplete,
                },
            )?;
            Ok(Some(AssembledScripts {
                output: payment.output(),
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        Some(ScriptType::P2sh) => {
            let inner = match assemble_input(record.redeem_script_type, record, allow_incomplete)? {
                Some(inner) => inner,
                None => return Ok(None),
            };
            let payment = P2sh::new(P2shArgs {
                redeem: Some(RedeemParts {
                    output: inner.output.or_else(|| record.redeem_script.clone()),
                    input: inner.input,
                    witness: inner.witness,
                }),
                ..Default::default()
            })?;
            Ok(Some(AssembledScripts {
                output: payment.output(),
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        Some(ScriptType::P2wsh) => {
            let inner = match assemble_input(record.witness_script_type, record, allow_incomplete)?
            {
                Some(inner) => inner,
                None => return Ok(None),
            };
            let payment = P2wsh::new(P2wshArgs {
                redeem: Some(RedeemParts {
                    output: record.witness_script.clone(),
                    input: inner.input,
                    witness: inner.witness,
                }),
                ..Default::default()
            })?;
            Ok(Some(AssembledScripts {
                output: payment.output(),
                input: payment.input(),
                witness: payment.witness(),
            }))
        }

        _ => Ok(None),
    }
}

// -----------------------------------------------------------------------
// The builder
// -----------------------------------------------------------------------

/// Options for one `sign` call.
///
/// All fields default to absent; `hash_type` falls back to
/// `SIGHASH_ALL`. The redeem/witness script and value are required the
/// first time a P2SH, P2WSH, or witness input is signed and must stay
/// consistent on later calls.
#[derive(Clone, Debug, Default)]
pub struct SignOptions {
    /// The P2SH redeem script.
    pub redeem_script: Option<Script>,
    /// The sighash flag to commit under.
    pub hash_type: Option<u8>,
    /// The value of the output being spent (witness inputs).
    pub witness_value: Option<u64>,
    /// The P2WSH witness script.
    pub witness_script: Option<Script>,
}

/// Builds a transaction incrementally, accumulating signatures per input
/// and guarding committed state.
///
/// Inputs and outputs are added first; each `sign` call resolves one
/// input's signing context (lazily, on first use) and fills one
/// signature slot. `build` inverts every input's template back into its
/// final scriptSig/witness; `build_incomplete` does the same but
/// tolerates missing material, emitting positional placeholders for
/// multisig. Once a signature exists, mutations that would invalidate it
/// are rejected.
pub struct TransactionBuilder {
    network: Network,
    maximum_fee_rate: u64,
    tx: Transaction,
    inputs: Vec<InputRecord>,
    used_outpoints: HashSet<([u8; 32], u32)>,
}

impl TransactionBuilder {
    /// Create a builder with the default absurd-fee ceiling.
    ///
    /// # Arguments
    /// * `network` - Parameters used to resolve address-form outputs.
    ///
    /// # Returns
    /// An empty builder over a version-2 transaction.
    pub fn new(network: Network) -> Self {
        Self::with_fee_rate(network, DEFAULT_MAXIMUM_FEE_RATE)
    }

    /// Create a builder with an explicit absurd-fee ceiling.
    ///
    /// # Arguments
    /// * `network` - Parameters used to resolve address-form outputs.
    /// * `maximum_fee_rate` - Ceiling in value units per virtual byte.
    ///
    /// # Returns
    /// An empty builder over a version-2 transaction.
    pub fn with_fee_rate(network: Network, maximum_fee_rate: u64) -> Self {
        let mut tx = Transaction::new();
        tx.version = 2;
        TransactionBuilder {
            network,
            maximum_fee_rate,
            tx,
            inputs: Vec::new(),
            used_outpoints: HashSet::new(),
        }
    }

    /// Import an existing transaction into builder state.
    ///
    /// Outputs are copied first (so the lock time and inputs land before
    /// any signature guard can trip), then each input is expanded from
    /// its scriptSig/witness, and finally multisig signature alignment
    /// is repaired against the imported transaction.
    ///
    /// # Arguments
    /// * `transaction` - The transaction to import.
    /// * `network` - Parameters used to resolve address-form outputs.
    ///
    /// # Returns
    /// A builder whose state reproduces the transaction, ready for
    /// re-signing, or a `BuildError` if an input cannot be represented.
    pub fn from_transaction(
        transaction: &Transaction,
        network: Network,
    ) -> Result<Self, BuildError> {
        let mut builder = Self::new(network);
        builder.set_version(transaction.version);
        builder.set_lock_time(transaction.lock_time)?;

        for output in &transaction.outputs {
            builder.add_output(output.locking_script.clone(), output.value)?;
        }
        for input in &transaction.inputs {
            builder.add_input_unsafe(
                input.source_txid,
                input.source_vout,
                Some(input.sequence),
                Some(&input.unlocking_script),
                &input.witness,
                None,
                None,
            )?;
        }
        for vin in 0..builder.inputs.len() {
            fix_multisig_order(&mut builder.inputs[vin], transaction, vin)?;
        }
        Ok(builder)
    }

    /// The network this builder resolves addresses against.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Set the transaction lock time.
    ///
    /// # Arguments
    /// * `lock_time` - Block height or Unix timestamp.
    ///
    /// # Returns
    /// `Ok(())`, or `StateViolation` if any signature already exists
    /// (every signature commits to the lock time).
    pub fn set_lock_time(&mut self, lock_time: u32) -> Result<(), BuildError> {
        let any_signature = self.inputs.iter().any(|record| {
            record
                .signatures
                .as_ref()
                .is_some_and(|slots| slots.iter().any(|slot| slot.is_some()))
        });
        if any_signature {
            return Err(BuildError::StateViolation);
        }
        self.tx.lock_time = lock_time;
        Ok(())
    }

    /// Set the transaction version.
    ///
    /// # Arguments
    /// * `version` - The format version.
    pub fn set_version(&mut self, version: u32) {
        self.tx.version = version;
    }

    /// Add an input spending the given outpoint.
    ///
    /// # Arguments
    /// * `txid` - The previous transaction ID in display (reversed hex)
    ///   order.
    /// * `vout` - The output index being spent.
    /// * `sequence` - Sequence number; finalized when absent.
    /// * `prev_out_script` - The previous output's locking script, when
    ///   known. Supplying it lets the builder classify and pre-expand the
    ///   input.
    ///
    /// # Returns
    /// The new input index, or a `BuildError` (`StateViolation` when an
    /// existing signature forbids more inputs, `DuplicateOutpoint`,
    /// `CoinbaseInput`).
    pub fn add_input(
        &mut self,
        txid: &str,
        vout: u32,
        sequence: Option<u32>,
        prev_out_script: Option<Script>,
    ) -> Result<usize, BuildError> {
        if !self.can_modify_inputs() {
            return Err(BuildError::StateViolation);
        }
        let bytes = hex::decode(txid).map_err(|e| {
            BuildError::Transaction(TransactionError::SerializationError(format!(
                "invalid txid hex: {}",
                e
            )))
        })?;
        let mut hash: [u8; 32] = bytes.try_into().map_err(|_| {
            BuildError::Transaction(TransactionError::SerializationError(
                "txid must be 32 bytes".to_string(),
            ))
        })?;
        // Display order is reversed from the internal hash order.
        hash.reverse();
        self.add_input_unsafe(hash, vout, sequence, None, &[], prev_out_script.as_ref(), None)
    }

    /// Add an input spending an output of a known transaction.
    ///
    /// Captures the previous output's locking script and value, so a
    /// witness input becomes signable without an explicit value and the
    /// final fee check sees this input's contribution.
    ///
    /// # Arguments
    /// * `prev_tx` - The transaction being spent.
    /// * `vout` - The output index being spent.
    /// * `sequence` - Sequence number; finalized when absent.
    ///
    /// # Returns
    /// The new input index, or a `BuildError`.
    pub fn add_input_from_tx(
        &mut self,
        prev_tx: &Transaction,
        vout: u32,
        sequence: Option<u32>,
    ) -> Result<usize, BuildError> {
        if !self.can_modify_inputs() {
            return Err(BuildError::StateViolation);
        }
        let output = prev_tx.outputs.get(vout as usize).ok_or_else(|| {
            BuildError::Transaction(TransactionError::InvalidTransaction(format!(
                "no output at index {}",
                vout
            )))
        })?;
        let script = output.locking_script.clone();
        let value = output.value;
        self.add_input_unsafe(
            prev_tx.tx_id(),
            vout,
            sequence,
            None,
            &[],
            Some(&script),
            Some(value),
        )
    }

    /// Register an input without evaluating the mutation guard.
    #[allow(clippy::too_many_arguments)]
    fn add_input_unsafe(
        &mut self,
        hash: [u8; 32],
        vout: u32,
        sequence: Option<u32>,
        script_sig: Option<&Script>,
        witness: &[Vec<u8>],
        prev_out_script: Option<&Script>,
        value: Option<u64>,
    ) -> Result<usize, BuildError> {
        if Transaction::is_coinbase_hash(&hash) {
            return Err(BuildError::CoinbaseInput);
        }
        if self.used_outpoints.contains(&(hash, vout)) {
            let mut display = hash;
            display.reverse();
            return Err(BuildError::DuplicateOutpoint {
                txid: hex::encode(display),
                vout,
            });
        }

        // Derive what we can from the existing unlocking data.
        let mut record = match script_sig {
            Some(script) => expand_input(script, witness, None, None)?,
            None => InputRecord::default(),
        };

        if value.is_some() {
            record.value = value;
        }

        // Derive what we can from the previous output script.
        if record.prev_out_script.is_none() {
            if let Some(prev_out_script) = prev_out_script {
                let mut prev_out_type = None;
                if record.pubkeys.is_none() && record.signatures.is_none() {
                    let expanded = expand_output(prev_out_script, None)?;
                    if expanded.pubkeys.is_some() {
                        record.pubkeys = expanded.pubkeys;
                        record.signatures = expanded.signatures;
                    }
                    prev_out_type = Some(expanded.script_type);
                }
                record.prev_out_type = match prev_out_type {
                    Some(script_type) => Some(script_type),
                    None => Some(classify_output(prev_out_script)?),
                };
                record.prev_out_script = Some(prev_out_script.clone());
            }
        }

        let mut tx_input = TxInput::new();
        tx_input.source_txid = hash;
        tx_input.source_vout = vout;
        if let Some(sequence) = sequence {
            tx_input.sequence = sequence;
        }
        let vin = self.tx.add_input(tx_input);
        self.inputs.push(record);
        self.used_outpoints.insert((hash, vout));
        Ok(vin)
    }

    /// Add an output paying a locking script.
    ///
    /// # Arguments
    /// * `locking_script` - The output's locking script.
    /// * `value` - The amount in base units.
    ///
    /// # Returns
    /// The new output index, or `StateViolation` when an existing
    /// signature commits to the current output set.
    pub fn add_output(&mut self, locking_script: Script, value: u64) -> Result<usize, BuildError> {
        if !self.can_modify_outputs() {
            return Err(BuildError::StateViolation);
        }
        Ok(self.tx.add_output(TxOutput {
            value,
            locking_script,
        }))
    }

    /// Add an output paying an address.
    ///
    /// Accepts base58check (P2PKH, P2SH) and bech32 (P2WPKH, P2WSH)
    /// addresses for this builder's network.
    ///
    /// # Arguments
    /// * `address` - The destination address.
    /// * `value` - The amount in base units.
    ///
    /// # Returns
    /// The new output index, or a `BuildError`.
    pub fn add_output_address(&mut self, address: &str, value: u64) -> Result<usize, BuildError> {
        let script = to_output_script(address, self.network)?;
        self.add_output(script, value)
    }

    /// Sign one input with a private key.
    ///
    /// Resolves the input into a signable state on first use (applying
    /// any redeem/witness script and witness value from `options`),
    /// computes the BIP143 hash for witness inputs or the legacy hash
    /// otherwise, and fills the signature slot matching the key's public
    /// key.
    ///
    /// # Arguments
    /// * `vin` - The input index.
    /// * `key` - The signing key. Its compression flag selects the
    ///   public key form matched against the slots.
    /// * `options` - Redeem/witness script, sighash flag (default
    ///   `SIGHASH_ALL`), and witness value.
    ///
    /// # Returns
    /// `Ok(())`, or a `BuildError`: `AlreadySigned` when the slot is
    /// filled, `UncompressedKeyRejected` for an uncompressed key on a
    /// witness input, `KeyNotApplicable` when no slot matches.
    pub fn sign(
        &mut self,
        vin: usize,
        key: &PrivateKey,
        options: SignOptions,
    ) -> Result<(), BuildError> {
        if vin >= self.inputs.len() {
            return Err(BuildError::InputIndexOutOfRange(vin));
        }
        let hash_type = options.hash_type.unwrap_or(SIGHASH_ALL);
        if self.needs_outputs(hash_type) {
            return Err(BuildError::NeedsOutputs);
        }

        let our_pubkey = key.pub_key_bytes();
        {
            let record = &mut self.inputs[vin];

            if let (Some(existing), Some(supplied)) =
                (&record.redeem_script, &options.redeem_script)
            {
                if !existing.equals(supplied) {
                    return Err(BuildError::InconsistentRedeem);
                }
            }

            if !can_sign(record) {
                if let Some(witness_value) = options.witness_value {
                    if let Some(existing) = record.value {
                        if existing != witness_value {
                            return Err(BuildError::InconsistentValue);
                        }
                    }
                    record.value = Some(witness_value);
                }
                if !can_sign(record) {
                    prepare_input(
                        record,
                        &our_pubkey,
                        options.redeem_script.as_ref(),
                        options.witness_script.as_ref(),
                    )?;
                }
                if !can_sign(record) {
                    let type_name = record
                        .prev_out_type
                        .map(|script_type| script_type.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(BuildError::UnsupportedPattern(format!(
                        "{} not supported",
                        type_name
                    )));
                }
            }
        }

        let (sign_script, has_witness, value) = {
            let record = &self.inputs[vin];
            (
                record
                    .sign_script
                    .clone()
                    .ok_or_else(|| BuildError::UnsupportedPattern("unresolved input".to_string()))?,
                record.has_witness,
                record.value,
            )
        };

        let signature_hash = if has_witness {
            let value = value.ok_or(BuildError::MissingValue)?;
            self.tx
                .hash_for_witness_v0(vin, &sign_script, value, hash_type)?
        } else {
            self.tx.hash_for_signature(vin, &sign_script, hash_type)?
        };

        let record = &mut self.inputs[vin];
        let pubkeys = record.pubkeys.clone().unwrap_or_default();
        for (i, slot) in pubkeys.iter().enumerate() {
            let Some(pubkey) = slot else { continue };
            if pubkey.as_slice() != our_pubkey.as_slice() {
                continue;
            }
            let signatures = record
                .signatures
                .as_mut()
                .ok_or(BuildError::KeyNotApplicable)?;
            if signatures[i].is_some() {
                return Err(BuildError::AlreadySigned);
            }
            if our_pubkey.len() != 33 && has_witness {
                return Err(BuildError::UncompressedKeyRejected);
            }
            let signature = key.sign(&signature_hash)?;
            signatures[i] = Some(script_signature::encode(
                &signature.to_compact(),
                hash_type,
            )?);
            return Ok(());
        }
        Err(BuildError::KeyNotApplicable)
    }

    /// Assemble the final transaction.
    ///
    /// Every input must resolve to a complete scriptSig/witness; the
    /// transaction must have at least one input and one output; and the
    /// implied fee rate must stay under the configured ceiling.
    ///
    /// # Returns
    /// The finished transaction, or a `BuildError` (`IncompleteInput`,
    /// `UnknownInputType`, `AbsurdFee`, ...).
    pub fn build(&self) -> Result<Transaction, BuildError> {
        self.build_internal(false)
    }

    /// Assemble whatever partial transaction the current state allows.
    ///
    /// Missing signatures leave an input's script empty (or, for
    /// multisig, filled with positional zero-push placeholders); the fee
    /// sanity check is skipped.
    ///
    /// # Returns
    /// The partially signed transaction.
    pub fn build_incomplete(&self) -> Result<Transaction, BuildError> {
        self.build_internal(true)
    }

    fn build_internal(&self, allow_incomplete: bool) -> Result<Transaction, BuildError> {
        if !allow_incomplete {
            if self.tx.inputs.is_empty() {
                return Err(BuildError::NoInputs);
            }
            if self.tx.outputs.is_empty() {
                return Err(BuildError::NoOutputs);
            }
        }

        let mut tx = self.tx.clone();
        for (i, record) in self.inputs.iter().enumerate() {
            if record.prev_out_type.is_none() && !allow_incomplete {
                return Err(BuildError::TransactionIncomplete);
            }
            match assemble_input(record.prev_out_type, record, allow_incomplete)? {
                Some(assembled) => {
                    if !allow_incomplete
                        && assembled.input.is_none()
                        && assembled.witness.is_none()
                    {
                        return Err(BuildError::IncompleteInput(i));
                    }
                    if let Some(script) = assembled.input {
                        tx.set_input_script(i, script);
                    }
                    if let Some(witness) = assembled.witness {
                        tx.set_witness(i, witness);
                    }
                }
                None => {
                    if !allow_incomplete {
                        if record.prev_out_type == Some(ScriptType::NonStandard) {
                            return Err(BuildError::UnknownInputType(i));
                        }
                        return Err(BuildError::IncompleteInput(i));
                    }
                }
            }
        }

        if !allow_incomplete {
            let rate = self.fee_rate(&tx);
            if rate > self.maximum_fee_rate {
                return Err(BuildError::AbsurdFee {
                    rate,
                    maximum: self.maximum_fee_rate,
                });
            }
        }

        Ok(tx)
    }

    /// Estimate the fee rate of a finalized transaction.
    ///
    /// Best-effort only: inputs with unknown value contribute zero, so
    /// the result can under-count the true fee. Used solely by the
    /// absurd-fee check.
    fn fee_rate(&self, tx: &Transaction) -> u64 {
        let incoming: u64 = self.inputs.iter().filter_map(|record| record.value).sum();
        let outgoing: u64 = self.tx.outputs.iter().map(|output| output.value).sum();
        let fee = incoming.saturating_sub(outgoing);
        fee / (tx.virtual_size().max(1) as u64)
    }

    // -------------------------------------------------------------------
    // Mutation guards
    // -------------------------------------------------------------------

    /// Whether another input can be added without invalidating existing
    /// signatures.
    ///
    /// Only signatures carrying `SIGHASH_ANYONECANPAY` survive a change
    /// to the input set.
    fn can_modify_inputs(&self) -> bool {
        self.inputs.iter().all(|record| {
            record.signatures.as_ref().map_or(true, |slots| {
                slots.iter().all(|slot| match slot {
                    None => true,
                    Some(signature) => {
                        signature_hash_type(signature) & SIGHASH_ANYONECANPAY != 0
                    }
                })
            })
        })
    }

    /// Whether another output can be added without invalidating existing
    /// signatures.
    ///
    /// `SIGHASH_NONE` signatures never care; `SIGHASH_SINGLE` signatures
    /// tolerate the addition only while the input count does not exceed
    /// the output count; everything else commits to the full output set.
    fn can_modify_outputs(&self) -> bool {
        let n_inputs = self.tx.inputs.len();
        let n_outputs = self.tx.outputs.len();
        self.inputs.iter().all(|record| {
            record.signatures.as_ref().map_or(true, |slots| {
                slots.iter().all(|slot| {
                    let Some(signature) = slot else { return true };
                    let masked = signature_hash_type(signature) & SIGHASH_MASK;
                    if masked == SIGHASH_NONE {
                        return true;
                    }
                    if masked == SIGHASH_SINGLE {
                        return n_inputs <= n_outputs;
                    }
                    false
                })
            })
        })
    }

    /// Whether signing under `signing_hash_type` requires outputs to
    /// exist first.
    fn needs_outputs(&self, signing_hash_type: u8) -> bool {
        if signing_hash_type == SIGHASH_ALL {
            return self.tx.outputs.is_empty();
        }
        // The bitwise test also lets SIGHASH_SINGLE through (0x03 & 0x02);
        // the output-count check in can_modify_outputs covers SINGLE.
        self.tx.outputs.is_empty()
            && self.inputs.iter().any(|record| {
                record.signatures.as_ref().is_some_and(|slots| {
                    slots.iter().any(|slot| {
                        slot.as_ref()
                            .is_some_and(|sig| signature_hash_type(sig) & SIGHASH_NONE == 0)
                    })
                })
            })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for expansion and assembly; the end-to-end signing
    //! scenarios live in the crate-level test module.

    use super::*;
    use txforge_primitives::ec::PrivateKey;

    /// The scalar-1 private key, whose pubkey is the generator point.
    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    fn key_one() -> PrivateKey {
        PrivateKey::from_hex(KEY_ONE).expect("valid key")
    }

    fn p2pkh_output(pubkey: &[u8]) -> Script {
        P2pkh::new(P2pkhArgs {
            pubkey: Some(pubkey.to_vec()),
            ..Default::default()
        })
        .expect("should construct")
        .output()
        .expect("derives output")
    }

    /// Verify expanding a P2PKH scriptSig recovers the pubkey, signature,
    /// and previous output script.
    #[test]
    fn test_expand_input_p2pkh() {
        let key = key_one();
        let pubkey = key.pub_key_bytes();
        let mut sig = [0u8; 64];
        for (i, b) in sig.iter_mut().enumerate() {
            *b = ((i as u8) % 0x7f) + 1;
        }
        let wire = script_signature::encode(&sig, SIGHASH_ALL).expect("valid signature");

        let mut script_sig = Script::new();
        script_sig.append_push_data(&wire).expect("push");
        script_sig.append_push_data(&pubkey).expect("push");

        let record = expand_input(&script_sig, &[], None, None).expect("expands");
        assert_eq!(record.prev_out_type, Some(ScriptType::P2pkh));
        assert_eq!(record.prev_out_script, Some(p2pkh_output(&pubkey)));
        assert_eq!(record.pubkeys, Some(vec![Some(pubkey)]));
        assert_eq!(record.signatures, Some(vec![Some(wire)]));
    }

    /// Verify an empty scriptSig and witness expand to an empty record.
    #[test]
    fn test_expand_input_empty() {
        let record = expand_input(&Script::new(), &[], None, None).expect("expands");
        assert!(record.prev_out_type.is_none());
        assert!(record.pubkeys.is_none());
    }

    /// Verify expanding a previous output populates slots only when our
    /// pubkey matches the committed hash.
    #[test]
    fn test_expand_output_pubkey_match() {
        let key = key_one();
        let pubkey = key.pub_key_bytes();
        let output = p2pkh_output(&pubkey);

        let matched = expand_output(&output, Some(&pubkey)).expect("expands");
        assert_eq!(matched.script_type, ScriptType::P2pkh);
        assert_eq!(matched.pubkeys, Some(vec![Some(pubkey.clone())]));
        assert_eq!(matched.signatures, Some(vec![None]));

        let other = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000002",
        )
        .expect("valid key");
        let unmatched = expand_output(&output, Some(&other.pub_key_bytes())).expect("expands");
        assert_eq!(unmatched.script_type, ScriptType::P2pkh);
        assert!(unmatched.pubkeys.is_none());
    }

    /// Verify preparing a bare record with no previous output assumes a
    /// P2PKH paying our key.
    #[test]
    fn test_prepare_input_fallback() {
        let key = key_one();
        let pubkey = key.pub_key_bytes();
        let mut record = InputRecord::default();

        prepare_input(&mut record, &pubkey, None, None).expect("prepares");
        assert_eq!(record.prev_out_type, Some(ScriptType::P2pkh));
        assert_eq!(record.sign_type, Some(ScriptType::P2pkh));
        assert_eq!(record.sign_script, Some(p2pkh_output(&pubkey)));
        assert!(!record.has_witness);
        assert!(can_sign(&record));
    }

    /// Verify a P2SH previous output cannot be prepared without its
    /// redeem script.
    #[test]
    fn test_prepare_input_requires_redeem() {
        let key = key_one();
        let mut record = InputRecord {
            prev_out_type: Some(ScriptType::P2sh),
            prev_out_script: Some(
                Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
                    .expect("valid hex"),
            ),
            ..Default::default()
        };
        let result = prepare_input(&mut record, &key.pub_key_bytes(), None, None);
        assert!(matches!(result, Err(BuildError::RedeemScriptRequired(_))));
    }
}
