//! Pay-to-script-hash template.
//!
//! input:   `[redeemScriptSig ...] {redeemScript}`
//! witness: the redeem's witness stack, when the redeem is a witness
//!          program
//! output:  `OP_HASH160 {hash160(redeemScript)} OP_EQUAL`

use std::cell::OnceCell;

use txforge_primitives::hash::hash160;
use txforge_script::address::{from_base58_check, to_base58_check};
use txforge_script::chunk::{compile_chunks, is_push_only, ScriptChunk};
use txforge_script::classify::is_p2sh_output;
use txforge_script::opcodes::{OP_DATA_20, OP_EQUAL, OP_HASH160};
use txforge_script::{Network, Script};

use crate::payments::{stacks_equal, PaymentOpts, RedeemParts};
use crate::PaymentError;

/// Partial field set for P2SH construction.
///
/// At least one of `address`, `hash`, `output`, `redeem`, or `input`
/// must be supplied.
#[derive(Clone, Debug, Default)]
pub struct P2shArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// Base58Check address.
    pub address: Option<String>,
    /// The 20-byte script hash.
    pub hash: Option<[u8; 20]>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The nested redeem.
    pub redeem: Option<RedeemParts>,
    /// The compiled input script.
    pub input: Option<Script>,
    /// The witness stack accompanying the input script.
    pub witness: Option<Vec<Vec<u8>>>,
}

/// A P2SH payment with lazily derived, memoized representations.
pub struct P2sh {
    args: P2shArgs,
    network: Network,
    address: OnceCell<Option<String>>,
    hash: OnceCell<Option<[u8; 20]>>,
    output: OnceCell<Option<Script>>,
    redeem: OnceCell<Option<RedeemParts>>,
    input: OnceCell<Option<Script>>,
    witness: OnceCell<Option<Vec<Vec<u8>>>>,
}

impl P2sh {
    /// Construct with default options (validation on).
    pub fn new(args: P2shArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: P2shArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.address.is_none()
            && args.hash.is_none()
            && args.output.is_none()
            && args.redeem.is_none()
            && args.input.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2sh {
            args,
            network,
            address: OnceCell::new(),
            hash: OnceCell::new(),
            output: OnceCell::new(),
            redeem: OnceCell::new(),
            input: OnceCell::new(),
            witness: OnceCell::new(),
        };
        if opts.validate {
            payment.validate()?;
        }
        Ok(payment)
    }

    /// The network these addresses encode for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Recover the redeem from the input script: the last push is the
    /// redeem script, everything before it is the redeem's scriptSig.
    fn redeem_from_input(&self) -> Option<RedeemParts> {
        let input = self.args.input.as_ref()?;
        let chunks = input.chunks().ok()?;
        let last = chunks.last()?;
        let redeem_output = Script::from_bytes(last.data.as_deref()?);
        let redeem_input = Script::from_bytes(&compile_chunks(&chunks[..chunks.len() - 1]).ok()?);
        Some(RedeemParts {
            output: Some(redeem_output),
            input: Some(redeem_input),
            witness: self.args.witness.clone().or_else(|| Some(Vec::new())),
        })
    }

    /// The effective redeem: the supplied one, or the one recovered from
    /// the input script.
    pub fn redeem(&self) -> Option<RedeemParts> {
        self.redeem
            .get_or_init(|| {
                if let Some(redeem) = &self.args.redeem {
                    return Some(redeem.clone());
                }
                self.redeem_from_input()
            })
            .clone()
    }

    /// The 20-byte script hash, derived in order of least effort from the
    /// output script, address, or redeem script.
    pub fn hash(&self) -> Option<[u8; 20]> {
        *self.hash.get_or_init(|| {
            if let Some(output) = &self.args.output {
                let bytes = output.to_bytes();
                if bytes.len() == 23 {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&bytes[2..22]);
                    return Some(hash);
                }
                return None;
            }
            if let Some(address) = &self.args.address {
                return from_base58_check(address).ok().map(|(_, hash)| hash);
            }
            if let Some(supplied) = self.args.hash {
                return Some(supplied);
            }
            let redeem = self.redeem()?;
            redeem.output.map(|output| hash160(output.to_bytes()))
        })
    }

    /// The Base58Check address.
    pub fn address(&self) -> Option<String> {
        self.address
            .get_or_init(|| {
                if let Some(address) = &self.args.address {
                    return Some(address.clone());
                }
                self.hash()
                    .map(|hash| to_base58_check(self.network.script_hash, &hash))
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
                let mut bytes = Vec::with_capacity(23);
                bytes.push(OP_HASH160);
                bytes.push(OP_DATA_20);
                bytes.extend_from_slice(&hash);
                bytes.push(OP_EQUAL);
                Some(Script::from_bytes(&bytes))
            })
            .clone()
    }

    /// The compiled input script, from the supplied field or the redeem's
    /// scriptSig plus the redeem script push.
    pub fn input(&self) -> Option<Script> {
        self.input
            .get_or_init(|| {
                if let Some(input) = &self.args.input {
                    return Some(input.clone());
                }
                let redeem = self.args.redeem.as_ref()?;
                let redeem_input = redeem.input.as_ref()?;
                let redeem_output = redeem.output.as_ref()?;
                let mut chunks = redeem_input.chunks().ok()?;
                chunks.push(ScriptChunk::push(redeem_output.to_bytes().to_vec()));
                Script::from_chunks(&chunks).ok()
            })
            .clone()
    }

    /// The witness stack: the redeem's witness, or empty once an input
    /// exists.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.witness
            .get_or_init(|| {
                if let Some(redeem) = self.redeem() {
                    if let Some(witness) = redeem.witness {
                        return Some(witness);
                    }
                }
                self.input().map(|_| Vec::new())
            })
            .clone()
    }

    /// Validate one redeem's internal consistency and fold its hash into
    /// the running cross-check.
    fn check_redeem(
        &self,
        redeem: &RedeemParts,
        hash: &mut Option<[u8; 20]>,
    ) -> Result<(), PaymentError> {
        if let Some(output) = &redeem.output {
            let chunks = output
                .chunks()
                .map_err(|_| PaymentError::RedeemOutputTooShort)?;
            if chunks.is_empty() {
                return Err(PaymentError::RedeemOutputTooShort);
            }
            let redeem_hash = hash160(output.to_bytes());
            match *hash {
                Some(existing) if existing != redeem_hash => {
                    return Err(PaymentError::HashMismatch)
                }
                _ => *hash = Some(redeem_hash),
            }
        }

        if let Some(input) = &redeem.input {
            let has_input = !input.is_empty();
            let has_witness = redeem.witness.as_ref().is_some_and(|w| !w.is_empty());
            if !has_input && !has_witness {
                return Err(PaymentError::RedeemEmpty);
            }
            if has_input && has_witness {
                return Err(PaymentError::RedeemAmbiguous);
            }
            if has_input {
                let chunks = input.chunks()?;
                if !is_push_only(&chunks) {
                    return Err(PaymentError::RedeemNonPushOnly);
                }
            }
        }

        Ok(())
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        let mut hash: Option<[u8; 20]> = None;

        if let Some(address) = &self.args.address {
            let (version, address_hash) = from_base58_check(address)
                .map_err(|e| PaymentError::AddressInvalid(e.to_string()))?;
            if version != self.network.script_hash {
                return Err(PaymentError::NetworkMismatch);
            }
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
            if !is_p2sh_output(output.to_bytes()) {
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

        if let Some(input) = &self.args.input {
            let chunks = input.chunks()?;
            if chunks.is_empty() {
                return Err(PaymentError::InputInvalid);
            }
            let derived = self
                .redeem_from_input()
                .ok_or(PaymentError::InputInvalid)?;
            self.check_redeem(&derived, &mut hash)?;
        }

        if let Some(redeem) = &self.args.redeem {
            if self.args.input.is_some() {
                let derived = self
                    .redeem_from_input()
                    .ok_or(PaymentError::InputInvalid)?;
                if let (Some(supplied), Some(recovered)) = (&redeem.output, &derived.output) {
                    if supplied != recovered {
                        return Err(PaymentError::RedeemOutputMismatch);
                    }
                }
                if let (Some(supplied), Some(recovered)) = (&redeem.input, &derived.input) {
                    if supplied != recovered {
                        return Err(PaymentError::RedeemInputMismatch);
                    }
                }
            }
            self.check_redeem(redeem, &mut hash)?;
        }

        if let Some(witness) = &self.args.witness {
            if let Some(redeem) = &self.args.redeem {
                if let Some(redeem_witness) = &redeem.witness {
                    if !stacks_equal(redeem_witness, witness) {
                        return Err(PaymentError::WitnessMismatch);
                    }
                }
            }
        }

        Ok(())
    }
}
