//! Bitcoin script opcode constants and name conversion.
//!
//! Only the opcodes the toolkit manipulates directly get named constants;
//! the full byte range is still decodable, with unknown opcodes rendered
//! as `OP_UNKNOWN_xx` in ASM output.

/// Push an empty byte vector (also known as OP_FALSE).
pub const OP_0: u8 = 0x00;
/// Alias for OP_0.
pub const OP_FALSE: u8 = 0x00;
/// Smallest direct data push opcode (push 1 byte).
pub const OP_DATA_1: u8 = 0x01;
/// Direct push of 20 bytes, the length of a Hash160.
pub const OP_DATA_20: u8 = 0x14;
/// Direct push of 32 bytes, the length of a SHA-256 digest.
pub const OP_DATA_32: u8 = 0x20;
/// Direct push of 33 bytes, the length of a compressed public key.
pub const OP_DATA_33: u8 = 0x21;
/// Largest direct data push opcode (push 75 bytes).
pub const OP_DATA_75: u8 = 0x4b;
/// The next byte holds the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// The next two bytes (LE) hold the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// The next four bytes (LE) hold the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push the number -1.
pub const OP_1NEGATE: u8 = 0x4f;
/// Reserved opcode; also the base for the small-integer opcodes.
pub const OP_RESERVED: u8 = 0x50;
/// Push the number 1 (also known as OP_TRUE).
pub const OP_1: u8 = 0x51;
/// Alias for OP_1.
pub const OP_TRUE: u8 = 0x51;
/// Push the number 2.
pub const OP_2: u8 = 0x52;
/// Push the number 3.
pub const OP_3: u8 = 0x53;
/// Push the number 16.
pub const OP_16: u8 = 0x60;

/// No operation.
pub const OP_NOP: u8 = 0x61;
/// Conditional execution start.
pub const OP_IF: u8 = 0x63;
/// Inverted conditional execution start.
pub const OP_NOTIF: u8 = 0x64;
/// Conditional alternative branch.
pub const OP_ELSE: u8 = 0x67;
/// Conditional execution end.
pub const OP_ENDIF: u8 = 0x68;
/// Fail unless the top stack item is truthy.
pub const OP_VERIFY: u8 = 0x69;
/// Mark the output as unspendable; the remainder carries arbitrary data.
pub const OP_RETURN: u8 = 0x6a;

/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;
/// Drop the top stack item.
pub const OP_DROP: u8 = 0x75;
/// Swap the top two stack items.
pub const OP_SWAP: u8 = 0x7c;

/// Push 1 if the top two items are equal, 0 otherwise.
pub const OP_EQUAL: u8 = 0x87;
/// OP_EQUAL followed by OP_VERIFY.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Add the top two stack items.
pub const OP_ADD: u8 = 0x93;

/// Hash the top item with RIPEMD-160.
pub const OP_RIPEMD160: u8 = 0xa6;
/// Hash the top item with SHA-1.
pub const OP_SHA1: u8 = 0xa7;
/// Hash the top item with SHA-256.
pub const OP_SHA256: u8 = 0xa8;
/// Hash the top item with RIPEMD-160(SHA-256(x)).
pub const OP_HASH160: u8 = 0xa9;
/// Hash the top item with SHA-256(SHA-256(x)).
pub const OP_HASH256: u8 = 0xaa;
/// Signature-hash scope separator; stripped before legacy sighash.
pub const OP_CODESEPARATOR: u8 = 0xab;
/// Verify an ECDSA signature against a public key.
pub const OP_CHECKSIG: u8 = 0xac;
/// OP_CHECKSIG followed by OP_VERIFY.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// Verify m-of-n ECDSA signatures.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// OP_CHECKMULTISIG followed by OP_VERIFY.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

/// Absolute lock-time check (BIP65).
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
/// Relative lock-time check (BIP112).
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;

/// Check whether an opcode pushes a small integer (OP_1 through OP_16).
///
/// # Arguments
/// * `op` - The opcode byte.
///
/// # Returns
/// `true` for OP_1..=OP_16.
pub fn is_small_int_op(op: u8) -> bool {
    (OP_1..=OP_16).contains(&op)
}

/// Convert an opcode byte to its canonical OP_xxx name.
///
/// # Arguments
/// * `op` - The opcode byte.
///
/// # Returns
/// The canonical name, or `OP_UNKNOWN_xx` for bytes without one.
pub fn opcode_to_string(op: u8) -> String {
    match op {
        OP_0 => "OP_FALSE".to_string(),
        OP_PUSHDATA1 => "OP_PUSHDATA1".to_string(),
        OP_PUSHDATA2 => "OP_PUSHDATA2".to_string(),
        OP_PUSHDATA4 => "OP_PUSHDATA4".to_string(),
        OP_1NEGATE => "OP_1NEGATE".to_string(),
        OP_RESERVED => "OP_RESERVED".to_string(),
        op if is_small_int_op(op) => format!("OP_{}", op - OP_RESERVED),
        OP_NOP => "OP_NOP".to_string(),
        OP_IF => "OP_IF".to_string(),
        OP_NOTIF => "OP_NOTIF".to_string(),
        OP_ELSE => "OP_ELSE".to_string(),
        OP_ENDIF => "OP_ENDIF".to_string(),
        OP_VERIFY => "OP_VERIFY".to_string(),
        OP_RETURN => "OP_RETURN".to_string(),
        OP_DUP => "OP_DUP".to_string(),
        OP_DROP => "OP_DROP".to_string(),
        OP_SWAP => "OP_SWAP".to_string(),
        OP_EQUAL => "OP_EQUAL".to_string(),
        OP_EQUALVERIFY => "OP_EQUALVERIFY".to_string(),
        OP_ADD => "OP_ADD".to_string(),
        OP_RIPEMD160 => "OP_RIPEMD160".to_string(),
        OP_SHA1 => "OP_SHA1".to_string(),
        OP_SHA256 => "OP_SHA256".to_string(),
        OP_HASH160 => "OP_HASH160".to_string(),
        OP_HASH256 => "OP_HASH256".to_string(),
        OP_CODESEPARATOR => "OP_CODESEPARATOR".to_string(),
        OP_CHECKSIG => "OP_CHECKSIG".to_string(),
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY".to_string(),
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG".to_string(),
        OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY".to_string(),
        OP_CHECKLOCKTIMEVERIFY => "OP_CHECKLOCKTIMEVERIFY".to_string(),
        OP_CHECKSEQUENCEVERIFY => "OP_CHECKSEQUENCEVERIFY".to_string(),
        other => format!("OP_UNKNOWN_{:02x}", other),
    }
}

/// Convert a canonical OP_xxx name to its opcode byte.
///
/// # Arguments
/// * `name` - The opcode name (e.g. "OP_DUP").
///
/// # Returns
/// `Some(opcode)` for known names, otherwise `None`.
pub fn string_to_opcode(name: &str) -> Option<u8> {
    match name {
        "OP_0" | "OP_FALSE" => Some(OP_0),
        "OP_PUSHDATA1" => Some(OP_PUSHDATA1),
        "OP_PUSHDATA2" => Some(OP_PUSHDATA2),
        "OP_PUSHDATA4" => Some(OP_PUSHDATA4),
        "OP_1NEGATE" => Some(OP_1NEGATE),
        "OP_RESERVED" => Some(OP_RESERVED),
        "OP_1" | "OP_TRUE" => Some(OP_1),
        "OP_NOP" => Some(OP_NOP),
        "OP_IF" => Some(OP_IF),
        "OP_NOTIF" => Some(OP_NOTIF),
        "OP_ELSE" => Some(OP_ELSE),
        "OP_ENDIF" => Some(OP_ENDIF),
        "OP_VERIFY" => Some(OP_VERIFY),
        "OP_RETURN" => Some(OP_RETURN),
        "OP_DUP" => Some(OP_DUP),
        "OP_DROP" => Some(OP_DROP),
        "OP_SWAP" => Some(OP_SWAP),
        "OP_EQUAL" => Some(OP_EQUAL),
        "OP_EQUALVERIFY" => Some(OP_EQUALVERIFY),
        "OP_ADD" => Some(OP_ADD),
        "OP_RIPEMD160" => Some(OP_RIPEMD160),
        "OP_SHA1" => Some(OP_SHA1),
        "OP_SHA256" => Some(OP_SHA256),
        "OP_HASH160" => Some(OP_HASH160),
        "OP_HASH256" => Some(OP_HASH256),
        "OP_CODESEPARATOR" => Some(OP_CODESEPARATOR),
        "OP_CHECKSIG" => Some(OP_CHECKSIG),
        "OP_CHECKSIGVERIFY" => Some(OP_CHECKSIGVERIFY),
        "OP_CHECKMULTISIG" => Some(OP_CHECKMULTISIG),
        "OP_CHECKMULTISIGVERIFY" => Some(OP_CHECKMULTISIGVERIFY),
        "OP_CHECKLOCKTIMEVERIFY" => Some(OP_CHECKLOCKTIMEVERIFY),
        "OP_CHECKSEQUENCEVERIFY" => Some(OP_CHECKSEQUENCEVERIFY),
        name => {
            // OP_2 through OP_16 are generated names.
            if let Some(rest) = name.strip_prefix("OP_") {
                if let Ok(n) = rest.parse::<u8>() {
                    if (1..=16).contains(&n) {
                        return Some(OP_RESERVED + n);
                    }
                }
            }
            None
        }
    }
}
