//! Pay-to-public-key-hash template.
//!
//! output: `OP_DUP OP_HASH160 {hash160(pubkey)} OP_EQUALVERIFY OP_CHECKSIG`
//! input:  `{signature} {pubkey}`

use std::cell::OnceCell;

use txforge_primitives::hash::hash160;
use txforge_script::address::{from_base58_check, to_base58_check};
use txforge_script::chunk::ScriptChunk;
use txforge_script::classify::{is_canonical_pubkey, is_p2pkh_output};
use txforge_script::opcodes::*;
use txforge_script::signature::is_canonical_script_signature;
use txforge_script::{Network, Script};

use crate::payments::PaymentOpts;
use crate::PaymentError;

/// Partial field set for P2PKH construction.
///
/// At least one of `address`, `hash`, `output`, `pubkey`, or `input`
/// must be supplied.
#[derive(Clone, Debug, Default)]
pub struct P2pkhArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// Base58Check address.
    pub address: Option<String>,
    /// The 20-byte pubkey hash.
    pub hash: Option<[u8; 20]>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The public key.
    pub pubkey: Option<Vec<u8>>,
    /// The wire signature (DER plus sighash byte).
    pub signature: Option<Vec<u8>>,
    /// The compiled input script.
    pub input: Option<Script>,
}

/// A P2PKH payment with lazily derived, memoized representations.
pub struct P2pkh {
    args: P2pkhArgs,
    network: Network,
    address: OnceCell<Option<String>>,
    hash: OnceCell<Option<[u8; 20]>>,
    output: OnceCell<Option<Script>>,
    pubkey: OnceCell<Option<Vec<u8>>>,
    signature: OnceCell<Option<Vec<u8>>>,
    input: OnceCell<Option<Script>>,
}

impl P2pkh {
    /// Construct with default options (validation on).
    ///
    /// # Arguments
    /// * `args` - The partial field set.
    ///
    /// # Returns
    /// The payment, or a `PaymentError` naming the inconsistency.
    pub fn new(args: P2pkhArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    ///
    /// # Arguments
    /// * `args` - The partial field set.
    /// * `opts` - Validation switches.
    ///
    /// # Returns
    /// The payment, or a `PaymentError` naming the inconsistency.
    pub fn with_opts(args: P2pkhArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.address.is_none()
            && args.hash.is_none()
            && args.output.is_none()
            && args.pubkey.is_none()
            && args.input.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2pkh {
            args,
            network,
            address: OnceCell::new(),
            hash: OnceCell::new(),
            output: OnceCell::new(),
            pubkey: OnceCell::new(),
            signature: OnceCell::new(),
            input: OnceCell::new(),
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

    /// Decode the supplied input script, if any.
    fn input_chunks(&self) -> Option<Vec<ScriptChunk>> {
        self.args.input.as_ref().and_then(|s| s.chunks().ok())
    }

    /// The 20-byte pubkey hash, derived from the output script, address,
    /// or public key.
    pub fn hash(&self) -> Option<[u8; 20]> {
        *self.hash.get_or_init(|| {
            if let Some(output) = &self.args.output {
                let bytes = output.to_bytes();
                if bytes.len() == 25 {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&bytes[3..23]);
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
            self.pubkey().map(|pubkey| hash160(&pubkey))
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
                    .map(|hash| to_base58_check(self.network.pubkey_hash, &hash))
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
                let mut bytes = Vec::with_capacity(25);
                bytes.push(OP_DUP);
                bytes.push(OP_HASH160);
                bytes.push(OP_DATA_20);
                bytes.extend_from_slice(&hash);
                bytes.push(OP_EQUALVERIFY);
                bytes.push(OP_CHECKSIG);
                Some(Script::from_bytes(&bytes))
            })
            .clone()
    }

    /// The public key, from the supplied field or the input script.
    pub fn pubkey(&self) -> Option<Vec<u8>> {
        self.pubkey
            .get_or_init(|| {
                if let Some(pubkey) = &self.args.pubkey {
                    return Some(pubkey.clone());
                }
                let chunks = self.input_chunks()?;
                chunks.get(1).and_then(|chunk| chunk.data.clone())
            })
            .clone()
    }

    /// The wire signature, from the supplied field or the input script.
    pub fn signature(&self) -> Option<Vec<u8>> {
        self.signature
            .get_or_init(|| {
                if let Some(signature) = &self.args.signature {
                    return Some(signature.clone());
                }
                let chunks = self.input_chunks()?;
                chunks.first().and_then(|chunk| chunk.data.clone())
            })
            .clone()
    }

    /// The compiled input script, from the supplied field or the
    /// signature/pubkey pair.
    pub fn input(&self) -> Option<Script> {
        self.input
            .get_or_init(|| {
                if let Some(input) = &self.args.input {
                    return Some(input.clone());
                }
                let signature = self.signature()?;
                let pubkey = self.pubkey()?;
                Script::from_chunks(&[ScriptChunk::push(signature), ScriptChunk::push(pubkey)])
                    .ok()
            })
            .clone()
    }

    /// The witness stack: always empty once an input exists.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.input().map(|_| Vec::new())
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        let mut hash: Option<[u8; 20]> = None;

        if let Some(address) = &self.args.address {
            let (version, address_hash) = from_base58_check(address)
                .map_err(|e| PaymentError::AddressInvalid(e.to_string()))?;
            if version != self.network.pubkey_hash {
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
            if !is_p2pkh_output(output.to_bytes()) {
                return Err(PaymentError::OutputInvalid);
            }
            let mut output_hash = [0u8; 20];
            output_hash.copy_from_slice(&output.to_bytes()[3..23]);
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

        if let Some(input) = &self.args.input {
            let chunks = input.chunks()?;
            if chunks.len() != 2 {
                return Err(PaymentError::InputInvalid);
            }
            let sig = chunks[0].data.as_ref().ok_or(PaymentError::InputInvalid)?;
            let pubkey = chunks[1].data.as_ref().ok_or(PaymentError::InputInvalid)?;
            if !is_canonical_script_signature(sig) {
                return Err(PaymentError::SignatureInvalid);
            }
            if !is_canonical_pubkey(pubkey) {
                return Err(PaymentError::PubkeyInvalid);
            }
            if let Some(supplied) = &self.args.signature {
                if supplied != sig {
                    return Err(PaymentError::SignatureMismatch);
                }
            }
            if let Some(supplied) = &self.args.pubkey {
                if supplied != pubkey {
                    return Err(PaymentError::PubkeyMismatch);
                }
            }
            let pubkey_hash = hash160(pubkey);
            if let Some(existing) = hash {
                if existing != pubkey_hash {
                    return Err(PaymentError::HashMismatch);
                }
            }
        }

        Ok(())
    }
}
