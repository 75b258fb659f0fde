//! Script signature codec.
//!
//! Converts between the fixed 64-byte compact `(r, s)` signature form and
//! the wire form found in scripts: a strict BIP66 DER encoding followed by
//! a single sighash flag byte. The compact form is what the EC layer
//! produces and verifies; the wire form is what scripts and witnesses
//! carry.

use crate::ScriptError;

/// A decoded script signature: the raw 64-byte `(r, s)` pair plus the
/// sighash flag that was appended on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptSignature {
    /// The 64-byte compact signature (32-byte R then 32-byte S).
    pub signature: [u8; 64],
    /// The sighash flag byte.
    pub hash_type: u8,
}

/// Check whether a sighash flag byte is in the allowed range.
///
/// BIP62 allows only 0x01, 0x02, 0x03 and their ANYONECANPAY variants
/// 0x81, 0x82, 0x83.
///
/// # Arguments
/// * `hash_type` - The flag byte.
///
/// # Returns
/// `true` if the flag is acceptable.
pub fn is_valid_hash_type(hash_type: u8) -> bool {
    let masked = hash_type & !0x80;
    (0x01..=0x03).contains(&masked)
}

/// Check whether a buffer is a canonical script signature.
///
/// A canonical script signature is a strict BIP66 DER encoding followed
/// by an in-range sighash flag byte.
///
/// # Arguments
/// * `buffer` - The candidate signature bytes.
///
/// # Returns
/// `true` if the buffer passes both checks.
pub fn is_canonical_script_signature(buffer: &[u8]) -> bool {
    if buffer.is_empty() {
        return false;
    }
    if !is_valid_hash_type(buffer[buffer.len() - 1]) {
        return false;
    }
    bip66_check(&buffer[..buffer.len() - 1])
}

/// Decode a wire signature into its compact form and sighash flag.
///
/// The last byte is the sighash flag; the remainder must be a strict
/// BIP66 DER structure. Each DER integer is normalized to exactly 32
/// bytes: a leading zero pad byte is stripped, then the value is
/// left-padded with zeros.
///
/// # Arguments
/// * `buffer` - The wire signature bytes.
///
/// # Returns
/// The decoded `ScriptSignature`, or `InvalidHashType` / `InvalidDer` on
/// malformed input.
pub fn decode(buffer: &[u8]) -> Result<ScriptSignature, ScriptError> {
    if buffer.is_empty() {
        return Err(ScriptError::InvalidDer("empty signature".to_string()));
    }

    let hash_type = buffer[buffer.len() - 1];
    if !is_valid_hash_type(hash_type) {
        return Err(ScriptError::InvalidHashType(hash_type));
    }

    let (r, s) = bip66_decode(&buffer[..buffer.len() - 1])?;

    let mut signature = [0u8; 64];
    from_der_integer(r, &mut signature[..32])?;
    from_der_integer(s, &mut signature[32..])?;

    Ok(ScriptSignature { signature, hash_type })
}

/// Encode a compact signature and sighash flag into wire form.
///
/// Each 32-byte half is minimized (leading zero bytes stripped, one zero
/// byte re-added only if the high bit of the first remaining byte is set,
/// per the DER sign rule), BIP66-framed, and the sighash flag byte is
/// appended.
///
/// # Arguments
/// * `signature` - The 64-byte compact signature.
/// * `hash_type` - The sighash flag byte.
///
/// # Returns
/// The wire signature bytes, or `InvalidHashType` if the flag is out of
/// range.
pub fn encode(signature: &[u8; 64], hash_type: u8) -> Result<Vec<u8>, ScriptError> {
    if !is_valid_hash_type(hash_type) {
        return Err(ScriptError::InvalidHashType(hash_type));
    }

    let r = to_der_integer(&signature[..32]);
    let s = to_der_integer(&signature[32..]);

    let mut out = Vec::with_capacity(6 + r.len() + s.len() + 1);
    out.push(0x30);
    out.push((4 + r.len() + s.len()) as u8);
    out.push(0x02);
    out.push(r.len() as u8);
    out.extend_from_slice(&r);
    out.push(0x02);
    out.push(s.len() as u8);
    out.extend_from_slice(&s);
    out.push(hash_type);
    Ok(out)
}

/// Minimize a 32-byte big-endian integer for DER encoding.
///
/// Strips leading zero bytes; if the value is all zeros a single zero
/// byte remains. Re-adds one zero byte if the high bit of the first
/// remaining byte is set.
fn to_der_integer(half: &[u8]) -> Vec<u8> {
    let mut start = 0;
    while start < half.len() && half[start] == 0 {
        start += 1;
    }
    if start == half.len() {
        return vec![0x00];
    }
    let trimmed = &half[start..];
    if trimmed[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(trimmed.len() + 1);
        out.push(0x00);
        out.extend_from_slice(trimmed);
        out
    } else {
        trimmed.to_vec()
    }
}

/// Expand a DER integer into a fixed 32-byte big-endian slot.
///
/// Strips a single leading zero pad byte if present, then left-pads the
/// remainder with zeros.
fn from_der_integer(mut value: &[u8], out: &mut [u8]) -> Result<(), ScriptError> {
    if !value.is_empty() && value[0] == 0x00 {
        value = &value[1..];
    }
    if value.len() > 32 {
        return Err(ScriptError::InvalidDer(format!(
            "integer too large: {} bytes",
            value.len()
        )));
    }
    out[32 - value.len()..].copy_from_slice(value);
    Ok(())
}

// ---------------------------------------------------------------------------
// BIP66 structure
// ---------------------------------------------------------------------------

/// Check a buffer against the strict BIP66 DER signature structure.
///
/// # Arguments
/// * `buffer` - The DER bytes (without any sighash flag).
///
/// # Returns
/// `true` if the structure is strictly valid.
pub fn bip66_check(buffer: &[u8]) -> bool {
    bip66_parse(buffer).is_some()
}

/// Decode a strict BIP66 DER signature into its R and S integer slices.
///
/// # Arguments
/// * `buffer` - The DER bytes (without any sighash flag).
///
/// # Returns
/// The `(r, s)` slices, or `InvalidDer` if the structure is malformed.
pub fn bip66_decode(buffer: &[u8]) -> Result<(&[u8], &[u8]), ScriptError> {
    bip66_parse(buffer)
        .ok_or_else(|| ScriptError::InvalidDer("malformed BIP66 structure".to_string()))
}

/// Shared BIP66 structure parser.
///
/// Layout: `0x30 <len> 0x02 <lenR> <R> 0x02 <lenS> <S>`, with the strict
/// rules on lengths, sign bits, and excessive padding.
fn bip66_parse(buffer: &[u8]) -> Option<(&[u8], &[u8])> {
    if buffer.len() < 8 || buffer.len() > 72 {
        return None;
    }
    if buffer[0] != 0x30 {
        return None;
    }
    if buffer[1] as usize != buffer.len() - 2 {
        return None;
    }
    if buffer[2] != 0x02 {
        return None;
    }

    let len_r = buffer[3] as usize;
    if len_r == 0 {
        return None;
    }
    if 5 + len_r >= buffer.len() {
        return None;
    }
    if buffer[4 + len_r] != 0x02 {
        return None;
    }

    let len_s = buffer[5 + len_r] as usize;
    if len_s == 0 {
        return None;
    }
    if 6 + len_r + len_s != buffer.len() {
        return None;
    }

    // Negative numbers are not allowed for R or S.
    if buffer[4] & 0x80 != 0 {
        return None;
    }
    // Excessive zero padding on R.
    if len_r > 1 && buffer[4] == 0x00 && buffer[5] & 0x80 == 0 {
        return None;
    }
    if buffer[len_r + 6] & 0x80 != 0 {
        return None;
    }
    // Excessive zero padding on S.
    if len_s > 1 && buffer[len_r + 6] == 0x00 && buffer[len_r + 7] & 0x80 == 0 {
        return None;
    }

    Some((&buffer[4..4 + len_r], &buffer[6 + len_r..]))
}
