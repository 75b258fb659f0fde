//! Pay-to-witness-public-key-hash template.
//!
//! witness: `{signature} {pubkey}`
//! input:   (empty)
//! output:  `OP_0 {hash160(pubkey)}`

use std::cell::OnceCell;

use txforge_primitives::hash::hash160;
use txforge_script::address::{from_bech32, to_bech32};
use txforge_script::classify::{is_canonical_pubkey, is_p2wpkh_output};
use txforge_script::opcodes::{OP_0, OP_DATA_20};
use txforge_script::signature::is_canonical_script_signature;
use txforge_script::{Network, Script};

use crate::payments::PaymentOpts;
use crate::PaymentError;

/// Partial field set for P2WPKH construction.
///
/// At least one of `address`, `hash`, `output`, `pubkey`, or `witness`
/// must be supplied.
#[derive(Clone, Debug, Default)]
pub struct P2wpkhArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// Bech32 address (witness version 0, 20-byte program).
    pub address: Option<String>,
    /// The 20-byte pubkey hash (witness program).
    pub hash: Option<[u8; 20]>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The compressed public key.
    pub pubkey: Option<Vec<u8>>,
    /// The wire signature (DER plus sighash byte).
    pub signature: Option<Vec<u8>>,
    /// The witness stack.
    pub witness: Option<Vec<Vec<u8>>>,
}

/// A P2WPKH payment with lazily derived, memoized representations.
pub struct P2wpkh {
    args: P2wpkhArgs,
    network: Network,
    address: OnceCell<Option<String>>,
    hash: OnceCell<Option<[u8; 20]>>,
    output: OnceCell<Option<Script>>,
    pubkey: OnceCell<Option<Vec<u8>>>,
    signature: OnceCell<Option<Vec<u8>>>,
    witness: OnceCell<Option<Vec<Vec<u8>>>>,
}

impl P2wpkh {
    /// Construct with default options (validation on).
    pub fn new(args: P2wpkhArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: P2wpkhArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.address.is_none()
            && args.hash.is_none()
            && args.output.is_none()
            && args.pubkey.is_none()
            && args.witness.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2wpkh {
            args,
            network,
            address: OnceCell::new(),
            hash: OnceCell::new(),
            output: OnceCell::new(),
            pubkey: OnceCell::new(),
            signature: OnceCell::new(),
            witness: OnceCell::new(),
        };
        if opts.validate {
            payment.validate()?;
        }
        Ok(payment)
    }

    /// The network this address encodes for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The 20-byte witness program, derived from the output script,
    /// address, or public key.
    pub fn hash(&self) -> Option<[u8; 20]> {
        *self.hash.get_or_init(|| {
            if let Some(output) = &self.args.output {
                let bytes = output.to_bytes();
                if bytes.len() == 22 {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&bytes[2..22]);
                    return Some(hash);
                }
                return None;
            }
            if let Some(address) = &self.args.address {
                let (_, _, program) = from_bech32(address).ok()?;
                if program.len() == 20 {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&program);
                    return Some(hash);
                }
                return None;
            }
            if let Some(supplied) = self.args.hash {
                return Some(supplied);
            }
            self.pubkey().map(|pubkey| hash160(&pubkey))
        })
    }

    /// The bech32 address.
    pub fn address(&self) -> Option<String> {
        self.address
            .get_or_init(|| {
                if let Some(address) = &self.args.address {
                    return Some(address.clone());
                }
                let hash = self.hash()?;
                to_bech32(self.network.bech32_hrp, 0, &hash).ok()
            })
            .clone()
    }

    /// The compiled output script.
    pub fn output(&self) -> Option<Script> {
        self.output
            .get_or_init(|| {
                if let Some(output) = &self.args.output {
                    return Some(output.clone());
                }
                let hash = self.hash()?;
                let mut bytes = Vec::with_capacity(22);
                bytes.push(OP_0);
                bytes.push(OP_DATA_20);
                bytes.extend_from_slice(&hash);
                Some(Script::from_bytes(&bytes))
            })
            .clone()
    }

    /// The public key, from the supplied field or the witness stack.
    pub fn pubkey(&self) -> Option<Vec<u8>> {
        self.pubkey
            .get_or_init(|| {
                if let Some(pubkey) = &self.args.pubkey {
                    return Some(pubkey.clone());
                }
                self.args.witness.as_ref()?.get(1).cloned()
            })
            .clone()
    }

    /// The wire signature, from the supplied field or the witness stack.
    pub fn signature(&self) -> Option<Vec<u8>> {
        self.signature
            .get_or_init(|| {
                if let Some(signature) = &self.args.signature {
                    return Some(signature.clone());
                }
                self.args.witness.as_ref()?.first().cloned()
            })
            .clone()
    }

    /// The scriptSig: always empty once a witness exists.
    pub fn input(&self) -> Option<Script> {
        self.witness().map(|_| Script::new())
    }

    /// The witness stack, from the supplied field or the
    /// signature/pubkey pair.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.witness
            .get_or_init(|| {
                if let Some(witness) = &self.args.witness {
                    return Some(witness.clone());
                }
                let signature = self.args.signature.clone()?;
                let pubkey = self.args.pubkey.clone()?;
                Some(vec![signature, pubkey])
            })
            .clone()
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        let mut hash: Option<[u8; 20]> = None;

        if let Some(address) = &self.args.address {
            let (hrp, version, program) = from_bech32(address)
                .map_err(|e| PaymentError::AddressInvalid(e.to_string()))?;
            if hrp != self.network.bech32_hrp {
                return Err(PaymentError::NetworkMismatch);
            }
            if version != 0 {
                return Err(PaymentError::AddressInvalid(format!(
                    "witness version {}",
                    version
                )));
            }
            if program.len() != 20 {
                return Err(PaymentError::AddressInvalid(format!(
                    "{}-byte witness program",
                    program.len()
                )));
            }
            let mut address_hash = [0u8; 20];
            address_hash.copy_from_slice(&program);
            hash = Some(address_hash);
        }

        if let Some(supplied) = self.args.hash {
            match hash {
                Some(existing) if existing != supplied => {
                    return Err(PaymentError::HashMismatch)
                }
                _ => hash = Some(supplied),
            }
        }

        if let Some(output) = &self.args.output {
            if !is_p2wpkh_output(output.to_bytes()) {
                return Err(PaymentError::OutputInvalid);
            }
            let mut output_hash = [0u8; 20];
            output_hash.copy_from_slice(&output.to_bytes()[2..22]);
            match hash {
                Some(existing) if existing != output_hash => {
                    return Err(PaymentError::HashMismatch)
                }
                _ => hash = Some(output_hash),
            }
        }

        if let Some(pubkey) = &self.args.pubkey {
            if !is_canonical_pubkey(pubkey) {
                return Err(PaymentError::PubkeyInvalid);
            }
            let pubkey_hash = hash160(pubkey);
            match hash {
                Some(existing) if existing != pubkey_hash => {
                    return Err(PaymentError::HashMismatch)
                }
                _ => hash = Some(pubkey_hash),
            }
        }

        if let Some(signature) = &self.args.signature {
            if !is_canonical_script_signature(signature) {
                return Err(PaymentError::SignatureInvalid);
            }
        }

        if let Some(witness) = &self.args.witness {
            if witness.len() != 2 {
                return Err(PaymentError::WitnessInvalid);
            }
            if !is_canonical_script_signature(&witness[0]) {
                return Err(PaymentError::WitnessInvalid);
            }
            if !is_canonical_pubkey(&witness[1]) {
                return Err(PaymentError::WitnessInvalid);
            }
            if let Some(supplied) = &self.args.signature {
                if supplied != &witness[0] {
                    return Err(PaymentError::SignatureMismatch);
                }
            }
            if let Some(supplied) = &self.args.pubkey {
                if supplied != &witness[1] {
                    return Err(PaymentError::PubkeyMismatch);
                }
            }
            let witness_hash = hash160(&witness[1]);
            if let Some(existing) = hash {
                if existing != witness_hash {
                    return Err(PaymentError::HashMismatch);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txforge_script::signature;

    const PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn wire_signature() -> Vec<u8> {
        let mut sig = [0u8; 64];
        for (i, b) in sig.iter_mut().enumerate() {
            *b = ((i as u8) % 0x7f) + 1;
        }
        signature::encode(&sig, 0x01).expect("valid signature")
    }

    /// Verify the full derivation chain from a pubkey, including the
    /// BIP173 example address.
    #[test]
    fn test_derive_from_pubkey() {
        let payment = P2wpkh::new(P2wpkhArgs {
            pubkey: Some(hex::decode(PUBKEY).expect("valid hex")),
            ..Default::default()
        })
        .expect("should construct");

        assert_eq!(
            hex::encode(payment.hash().expect("derives hash")),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert_eq!(
            payment.address().expect("derives address"),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
        assert_eq!(
            payment.output().expect("derives output").to_hex(),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert!(payment.witness().is_none());
    }

    /// Verify (signature, pubkey) derives the witness with an empty
    /// scriptSig, and the stack decomposes back.
    #[test]
    fn test_witness_roundtrip() {
        let pubkey = hex::decode(PUBKEY).expect("valid hex");
        let sig = wire_signature();
        let forward = P2wpkh::new(P2wpkhArgs {
            pubkey: Some(pubkey.clone()),
            signature: Some(sig.clone()),
            ..Default::default()
        })
        .expect("should construct");

        let witness = forward.witness().expect("derives witness");
        assert_eq!(witness, vec![sig.clone(), pubkey.clone()]);
        assert!(forward.input().expect("empty scriptSig").is_empty());

        let backward = P2wpkh::new(P2wpkhArgs {
            witness: Some(witness),
            ..Default::default()
        })
        .expect("should construct");
        assert_eq!(backward.pubkey().expect("recovers pubkey"), pubkey);
        assert_eq!(backward.signature().expect("recovers signature"), sig);
    }

    /// Verify construction fails with no informative field.
    #[test]
    fn test_not_enough_data() {
        assert!(matches!(
            P2wpkh::new(P2wpkhArgs::default()),
            Err(PaymentError::NotEnoughData)
        ));
    }

    /// Verify a testnet address is rejected under mainnet parameters.
    #[test]
    fn test_network_mismatch() {
        let hash = [0x42; 20];
        let testnet_address =
            to_bech32(Network::TESTNET.bech32_hrp, 0, &hash).expect("should encode");
        let result = P2wpkh::new(P2wpkhArgs {
            address: Some(testnet_address),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::NetworkMismatch)));
    }

    /// Verify a hash disagreement between pubkey and hash fails.
    #[test]
    fn test_hash_mismatch() {
        let result = P2wpkh::new(P2wpkhArgs {
            pubkey: Some(hex::decode(PUBKEY).expect("valid hex")),
            hash: Some([0x42; 20]),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::HashMismatch)));
    }

    /// Verify a malformed witness stack is rejected.
    #[test]
    fn test_witness_invalid() {
        let result = P2wpkh::new(P2wpkhArgs {
            witness: Some(vec![wire_signature()]),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::WitnessInvalid)));
    }
}
