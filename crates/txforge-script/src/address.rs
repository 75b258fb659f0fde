//! Bitcoin address handling.
//!
//! Legacy addresses (P2PKH, P2SH) use Base58Check with a network version
//! byte; segwit addresses (P2WPKH, P2WSH) use bech32 with a witness
//! version. `to_output_script` resolves any supported address string into
//! the locking script it stands for.

use bech32::{u5, FromBase32, ToBase32, Variant};

use txforge_primitives::base58;

use crate::opcodes::*;
use crate::{Network, Script, ScriptError};

// ---------------------------------------------------------------------------
// Base58Check addresses
// ---------------------------------------------------------------------------

/// Encode a 20-byte hash as a Base58Check address.
///
/// # Arguments
/// * `version` - The network version byte (pubkey_hash or script_hash).
/// * `hash` - The 20-byte payload.
///
/// # Returns
/// The Base58Check address string.
pub fn to_base58_check(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    base58::encode_check(&payload)
}

/// Decode a Base58Check address into its version byte and 20-byte hash.
///
/// # Arguments
/// * `address` - The Base58Check address string.
///
/// # Returns
/// A `(version, hash)` pair, or an error if the string is malformed, has
/// a bad checksum, or the payload is not 21 bytes.
pub fn from_base58_check(address: &str) -> Result<(u8, [u8; 20]), ScriptError> {
    let payload = base58::decode_check(address)
        .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", address, e)))?;

    if payload.len() != 21 {
        return Err(ScriptError::InvalidAddress(format!(
            "{} has a {}-byte payload",
            address,
            payload.len()
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok((payload[0], hash))
}

// ---------------------------------------------------------------------------
// Bech32 (segwit) addresses
// ---------------------------------------------------------------------------

/// Encode a witness program as a bech32 address.
///
/// # Arguments
/// * `hrp` - The network's human-readable part.
/// * `version` - The witness version (only 0 is produced by this toolkit).
/// * `program` - The witness program bytes.
///
/// # Returns
/// The bech32 address string, or an error if encoding fails.
pub fn to_bech32(hrp: &str, version: u8, program: &[u8]) -> Result<String, ScriptError> {
    let mut data = vec![u5::try_from_u8(version)
        .map_err(|e| ScriptError::InvalidAddress(format!("witness version: {}", e)))?];
    data.extend(program.to_base32());
    bech32::encode(hrp, data, Variant::Bech32)
        .map_err(|e| ScriptError::InvalidAddress(e.to_string()))
}

/// Decode a bech32 address into its parts.
///
/// # Arguments
/// * `address` - The bech32 address string.
///
/// # Returns
/// A `(hrp, version, program)` triple, or an error if the string is not
/// valid bech32 or carries no witness version.
pub fn from_bech32(address: &str) -> Result<(String, u8, Vec<u8>), ScriptError> {
    let (hrp, data, _variant) = bech32::decode(address)
        .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", address, e)))?;

    if data.is_empty() {
        return Err(ScriptError::InvalidAddress(format!(
            "{} carries no witness version",
            address
        )));
    }

    let version = data[0].to_u8();
    let program = Vec::<u8>::from_base32(&data[1..])
        .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", address, e)))?;
    Ok((hrp, version, program))
}

// ---------------------------------------------------------------------------
// Address to script resolution
// ---------------------------------------------------------------------------

/// Resolve an address string into the output script it locks to.
///
/// Tries Base58Check first (P2PKH and P2SH by version byte), then bech32
/// (witness version 0 with a 20- or 32-byte program). An address that
/// decodes under neither codec, or whose network details do not match
/// `network`, is rejected.
///
/// # Arguments
/// * `address` - The address string.
/// * `network` - The expected network parameters.
///
/// # Returns
/// The locking `Script`, or `UnknownAddressForm` if no codec accepts the
/// address for this network.
pub fn to_output_script(address: &str, network: Network) -> Result<Script, ScriptError> {
    if let Ok((version, hash)) = from_base58_check(address) {
        if version == network.pubkey_hash {
            let mut bytes = Vec::with_capacity(25);
            bytes.push(OP_DUP);
            bytes.push(OP_HASH160);
            bytes.push(OP_DATA_20);
            bytes.extend_from_slice(&hash);
            bytes.push(OP_EQUALVERIFY);
            bytes.push(OP_CHECKSIG);
            return Ok(Script::from_bytes(&bytes));
        }
        if version == network.script_hash {
            let mut bytes = Vec::with_capacity(23);
            bytes.push(OP_HASH160);
            bytes.push(OP_DATA_20);
            bytes.extend_from_slice(&hash);
            bytes.push(OP_EQUAL);
            return Ok(Script::from_bytes(&bytes));
        }
        return Err(ScriptError::UnknownAddressForm(address.to_string()));
    }

    if let Ok((hrp, version, program)) = from_bech32(address) {
        if hrp != network.bech32_hrp {
            return Err(ScriptError::InvalidAddress(format!(
                "{} has prefix {}, expected {}",
                address, hrp, network.bech32_hrp
            )));
        }
        if version == 0 && (program.len() == 20 || program.len() == 32) {
            let mut bytes = Vec::with_capacity(2 + program.len());
            bytes.push(OP_0);
            bytes.push(program.len() as u8);
            bytes.extend_from_slice(&program);
            return Ok(Script::from_bytes(&bytes));
        }
        return Err(ScriptError::UnknownAddressForm(address.to_string()));
    }

    Err(ScriptError::UnknownAddressForm(address.to_string()))
}

#[cfg(test)]
mod tests {
    //! Tests for address codecs and address-to-script resolution.

    use super::*;
    use crate::classify::{classify_output, ScriptType};

    // -----------------------------------------------------------------------
    // Base58Check
    // -----------------------------------------------------------------------

    /// Verify a known mainnet P2PKH address round-trips.
    #[test]
    fn test_base58_roundtrip() {
        let address = "1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr";
        let (version, hash) = from_base58_check(address).expect("should parse");
        assert_eq!(version, 0x00);
        assert_eq!(hex::encode(hash), "8fe80c75c9560e8b56ed64ea3c26e18d2c52211b");
        assert_eq!(to_base58_check(version, &hash), address);
    }

    /// Verify a corrupted address fails the checksum.
    #[test]
    fn test_base58_bad_checksum() {
        assert!(from_base58_check("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMs").is_err());
    }

    // -----------------------------------------------------------------------
    // Bech32
    // -----------------------------------------------------------------------

    /// Verify the BIP173 example P2WPKH address decodes and re-encodes.
    #[test]
    fn test_bech32_roundtrip() {
        let address = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
        let (hrp, version, program) = from_bech32(address).expect("should parse");
        assert_eq!(hrp, "bc");
        assert_eq!(version, 0);
        assert_eq!(hex::encode(&program), "751e76e8199196d454941c45d1b3a323f1433bd6");
        assert_eq!(
            to_bech32(&hrp, version, &program).expect("should encode"),
            address
        );
    }

    /// Verify invalid bech32 strings are rejected.
    #[test]
    fn test_bech32_invalid() {
        assert!(from_bech32("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").is_err());
        assert!(from_bech32("not an address").is_err());
    }

    // -----------------------------------------------------------------------
    // to_output_script
    // -----------------------------------------------------------------------

    /// Verify P2PKH address resolution produces a P2PKH script.
    #[test]
    fn test_to_output_script_p2pkh() {
        let script = to_output_script("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr", Network::MAINNET)
            .expect("should resolve");
        assert_eq!(classify_output(&script).expect("classifies"), ScriptType::P2pkh);
        assert_eq!(
            script.to_hex(),
            "76a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac"
        );
    }

    /// Verify P2SH address resolution produces a P2SH script.
    #[test]
    fn test_to_output_script_p2sh() {
        let address = to_base58_check(0x05, &[0x9d; 20]);
        let script = to_output_script(&address, Network::MAINNET).expect("should resolve");
        assert_eq!(classify_output(&script).expect("classifies"), ScriptType::P2sh);
    }

    /// Verify bech32 v0 address resolution produces witness scripts.
    #[test]
    fn test_to_output_script_segwit() {
        let script = to_output_script(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            Network::MAINNET,
        )
        .expect("should resolve");
        assert_eq!(
            classify_output(&script).expect("classifies"),
            ScriptType::P2wpkh
        );

        let wsh = to_bech32("bc", 0, &[0x11; 32]).expect("should encode");
        let script = to_output_script(&wsh, Network::MAINNET).expect("should resolve");
        assert_eq!(classify_output(&script).expect("classifies"), ScriptType::P2wsh);
    }

    /// Verify network mismatches are rejected.
    #[test]
    fn test_to_output_script_wrong_network() {
        // Mainnet P2PKH address against testnet parameters.
        assert!(
            to_output_script("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr", Network::TESTNET).is_err()
        );
        // Mainnet bech32 address against testnet parameters.
        assert!(to_output_script(
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            Network::TESTNET
        )
        .is_err());
    }

    /// Verify garbage is rejected with UnknownAddressForm.
    #[test]
    fn test_to_output_script_garbage() {
        assert!(matches!(
            to_output_script("definitely not an address", Network::MAINNET),
            Err(ScriptError::UnknownAddressForm(_))
        ));
    }
}
