//! Pay-to-witness-script-hash template.
//!
//! witness: `[redeem stack items ...] {witnessScript}`
//! input:   (empty)
//! output:  `OP_0 {sha256(witnessScript)}`

use std::cell::OnceCell;

use txforge_primitives::hash::sha256;
use txforge_script::address::{from_bech32, to_bech32};
use txforge_script::chunk::{is_push_only, to_stack};
use txforge_script::classify::is_p2wsh_output;
use txforge_script::opcodes::{OP_0, OP_DATA_32};
use txforge_script::{Network, Script};

use crate::payments::{stacks_equal, PaymentOpts, RedeemParts};
use crate::PaymentError;

/// Partial field set for P2WSH construction.
///
/// At least one of `address`, `hash`, `output`, `redeem`, or `witness`
/// must be supplied.
#[derive(Clone, Debug, Default)]
pub struct P2wshArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// Bech32 address (witness version 0, 32-byte program).
    pub address: Option<String>,
    /// The 32-byte SHA-256 of the witness script.
    pub hash: Option<[u8; 32]>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The nested redeem (its `output` is the witness script).
    pub redeem: Option<RedeemParts>,
    /// The witness stack.
    pub witness: Option<Vec<Vec<u8>>>,
}

/// A P2WSH payment with lazily derived, memoized representations.
pub struct P2wsh {
    args: P2wshArgs,
    network: Network,
    address: OnceCell<Option<String>>,
    hash: OnceCell<Option<[u8; 32]>>,
    output: OnceCell<Option<Script>>,
    redeem: OnceCell<Option<RedeemParts>>,
    witness: OnceCell<Option<Vec<Vec<u8>>>>,
}

impl P2wsh {
    /// Construct with default options (validation on).
    pub fn new(args: P2wshArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: P2wshArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.address.is_none()
            && args.hash.is_none()
            && args.output.is_none()
            && args.redeem.is_none()
            && args.witness.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2wsh {
            args,
            network,
            address: OnceCell::new(),
            hash: OnceCell::new(),
            output: OnceCell::new(),
            redeem: OnceCell::new(),
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

    /// Recover the redeem from a supplied witness stack: the last element
    /// is the witness script, the rest is its stack.
    fn redeem_from_witness(&self) -> Option<RedeemParts> {
        let witness = self.args.witness.as_ref()?;
        let script = witness.last()?;
        Some(RedeemParts {
            output: Some(Script::from_bytes(script)),
            input: Some(Script::new()),
            witness: Some(witness[..witness.len() - 1].to_vec()),
        })
    }

    /// The effective redeem: the supplied one, or the one recovered from
    /// the witness stack.
    pub fn redeem(&self) -> Option<RedeemParts> {
        self.redeem
            .get_or_init(|| {
                if let Some(redeem) = &self.args.redeem {
                    return Some(redeem.clone());
                }
                self.redeem_from_witness()
            })
            .clone()
    }

    /// The 32-byte witness program, derived from the output script,
    /// address, or witness script.
    pub fn hash(&self) -> Option<[u8; 32]> {
        *self.hash.get_or_init(|| {
            if let Some(output) = &self.args.output {
                let bytes = output.to_bytes();
                if bytes.len() == 34 {
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(&bytes[2..34]);
                    return Some(hash);
                }
                return None;
            }
            if let Some(address) = &self.args.address {
                let (_, _, program) = from_bech32(address).ok()?;
                if program.len() == 32 {
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(&program);
                    return Some(hash);
                }
                return None;
            }
            if let Some(supplied) = self.args.hash {
                return Some(supplied);
            }
            let redeem = self.redeem()?;
            redeem.output.map(|output| sha256(output.to_bytes()))
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
                let mut bytes = Vec::with_capacity(34);
                bytes.push(OP_0);
                bytes.push(OP_DATA_32);
                bytes.extend_from_slice(&hash);
                Some(Script::from_bytes(&bytes))
            })
            .clone()
    }

    /// The scriptSig: always empty once a witness exists.
    pub fn input(&self) -> Option<Script> {
        self.witness().map(|_| Script::new())
    }

    /// The witness stack.
    ///
    /// A redeem satisfied by a push-only scriptSig is converted into
    /// stack items; a redeem satisfied by its own witness is appended
    /// with the witness script.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.witness
            .get_or_init(|| {
                if let Some(witness) = &self.args.witness {
                    return Some(witness.clone());
                }
                let redeem = self.args.redeem.as_ref()?;
                let output = redeem.output.as_ref()?;

                if let Some(input) = &redeem.input {
                    if !input.is_empty() {
                        let chunks = input.chunks().ok()?;
                        let mut stack = to_stack(&chunks).ok()?;
                        stack.push(output.to_bytes().to_vec());
                        return Some(stack);
                    }
                }

                let redeem_witness = redeem.witness.clone()?;
                let mut stack = redeem_witness;
                stack.push(output.to_bytes().to_vec());
                Some(stack)
            })
            .clone()
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        let mut hash: Option<[u8; 32]> = None;

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
            if program.len() != 32 {
                return Err(PaymentError::AddressInvalid(format!(
                    "{}-byte witness program",
                    program.len()
                )));
            }
            let mut address_hash = [0u8; 32];
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
            if !is_p2wsh_output(output.to_bytes()) {
                return Err(PaymentError::OutputInvalid);
            }
            let mut output_hash = [0u8; 32];
            output_hash.copy_from_slice(&output.to_bytes()[2..34]);
            match hash {
                Some(existing) if existing != output_hash => {
                    return Err(PaymentError::HashMismatch)
                }
                _ => hash = Some(output_hash),
            }
        }

        if let Some(redeem) = &self.args.redeem {
            if let Some(output) = &redeem.output {
                let chunks = output
                    .chunks()
                    .map_err(|_| PaymentError::RedeemOutputTooShort)?;
                if chunks.is_empty() {
                    return Err(PaymentError::RedeemOutputTooShort);
                }
                let redeem_hash = sha256(output.to_bytes());
                match hash {
                    Some(existing) if existing != redeem_hash => {
                        return Err(PaymentError::HashMismatch)
                    }
                    _ => hash = Some(redeem_hash),
                }
            }

            let has_input = redeem.input.as_ref().is_some_and(|i| !i.is_empty());
            let has_witness = redeem.witness.as_ref().is_some_and(|w| !w.is_empty());
            if has_input && has_witness {
                return Err(PaymentError::RedeemAmbiguous);
            }
            if has_input {
                let chunks = redeem.input.as_ref().expect("input present").chunks()?;
                if !is_push_only(&chunks) {
                    return Err(PaymentError::RedeemNonPushOnly);
                }
            }
        }

        if let Some(witness) = &self.args.witness {
            if let Some(redeem) = &self.args.redeem {
                if let Some(redeem_witness) = &redeem.witness {
                    // The supplied stack carries the witness script as its
                    // final element; the redeem's stack does not.
                    if witness.is_empty() {
                        return Err(PaymentError::WitnessInvalid);
                    }
                    if !stacks_equal(redeem_witness, &witness[..witness.len() - 1]) {
                        return Err(PaymentError::WitnessMismatch);
                    }
                }
                if let Some(redeem_output) = &redeem.output {
                    match witness.last() {
                        Some(last) if last == redeem_output.to_bytes() => {}
                        _ => return Err(PaymentError::WitnessMismatch),
                    }
                }
            }
            if let Some(script) = witness.last() {
                let script_hash = sha256(script);
                if let Some(existing) = hash {
                    if existing != script_hash {
                        return Err(PaymentError::HashMismatch);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{P2ms, P2msArgs};
    use txforge_script::signature;

    const PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn wire_signature() -> Vec<u8> {
        let mut sig = [0u8; 64];
        for (i, b) in sig.iter_mut().enumerate() {
            *b = ((i as u8) % 0x7f) + 1;
        }
        signature::encode(&sig, 0x01).expect("valid signature")
    }

    /// A 1-of-1 multisig witness script over the test pubkey.
    fn witness_script() -> Script {
        P2ms::new(P2msArgs {
            m: Some(1),
            pubkeys: Some(vec![hex::decode(PUBKEY).expect("valid hex")]),
            ..Default::default()
        })
        .expect("should construct")
        .output()
        .expect("derives output")
    }

    /// Verify witness script -> hash -> output -> address derivation.
    #[test]
    fn test_derive_from_redeem() {
        let script = witness_script();
        let payment = P2wsh::new(P2wshArgs {
            redeem: Some(RedeemParts {
                output: Some(script.clone()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .expect("should construct");

        let expected_hash = sha256(script.to_bytes());
        assert_eq!(payment.hash().expect("derives hash"), expected_hash);

        let output = payment.output().expect("derives output");
        assert_eq!(output.len(), 34);
        assert_eq!(output.to_bytes()[0], OP_0);
        assert_eq!(&output.to_bytes()[2..34], &expected_hash);

        let address = payment.address().expect("derives address");
        assert!(address.starts_with("bc1"));
    }

    /// Verify a push-only redeem scriptSig converts into the witness
    /// stack with the script appended.
    #[test]
    fn test_redeem_input_to_witness() {
        let script = witness_script();
        let redeem_input = P2ms::new(P2msArgs {
            m: Some(1),
            signatures: Some(vec![Some(wire_signature())]),
            ..Default::default()
        })
        .expect("should construct")
        .input()
        .expect("derives input");

        let payment = P2wsh::new(P2wshArgs {
            redeem: Some(RedeemParts {
                output: Some(script.clone()),
                input: Some(redeem_input),
                witness: None,
            }),
            ..Default::default()
        })
        .expect("should construct");

        let witness = payment.witness().expect("derives witness");
        // OP_0 becomes an empty item, then the signature, then the script.
        assert_eq!(witness.len(), 3);
        assert!(witness[0].is_empty());
        assert_eq!(witness[1], wire_signature());
        assert_eq!(witness[2], script.to_bytes());
        assert!(payment.input().expect("empty scriptSig").is_empty());
    }

    /// Verify a witness stack decomposes back into the redeem.
    #[test]
    fn test_witness_decomposition() {
        let script = witness_script();
        let stack = vec![Vec::new(), wire_signature(), script.to_bytes().to_vec()];
        let payment = P2wsh::new(P2wshArgs {
            witness: Some(stack),
            ..Default::default()
        })
        .expect("should construct");

        let redeem = payment.redeem().expect("recovers redeem");
        assert_eq!(redeem.output.expect("witness script"), script);
        assert_eq!(
            redeem.witness.expect("stack"),
            vec![Vec::new(), wire_signature()]
        );
        assert_eq!(
            payment.hash().expect("derives hash"),
            sha256(script.to_bytes())
        );
    }

    /// Verify a hash disagreement against the witness script fails.
    #[test]
    fn test_hash_mismatch() {
        let result = P2wsh::new(P2wshArgs {
            hash: Some([0x42; 32]),
            redeem: Some(RedeemParts {
                output: Some(witness_script()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::HashMismatch)));
    }

    /// Verify ambiguous redeems (both input and witness) are rejected.
    #[test]
    fn test_redeem_ambiguous() {
        let result = P2wsh::new(P2wshArgs {
            redeem: Some(RedeemParts {
                output: Some(witness_script()),
                input: Some(Script::from_hex("00").expect("valid hex")),
                witness: Some(vec![vec![0x01]]),
            }),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::RedeemAmbiguous)));
    }

    /// Verify a testnet address is rejected under mainnet parameters.
    #[test]
    fn test_network_mismatch() {
        let address = to_bech32("tb", 0, &[0x11; 32]).expect("should encode");
        let result = P2wsh::new(P2wshArgs {
            address: Some(address),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::NetworkMismatch)));
    }

    /// Verify construction fails with no informative field.
    #[test]
    fn test_not_enough_data() {
        assert!(matches!(
            P2wsh::new(P2wshArgs::default()),
            Err(PaymentError::NotEnoughData)
        ));
    }
}
