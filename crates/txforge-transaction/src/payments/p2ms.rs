//! Bare multisig template.
//!
//! output: `OP_m {pubkey}... OP_n OP_CHECKMULTISIG`
//! input:  `OP_0 {signature}...`
//!
//! Signatures parallel the pubkey order positionally. A missing slot is
//! represented as `None` and encodes as an OP_0 placeholder when
//! incomplete construction is requested.

use std::cell::OnceCell;

use txforge_script::chunk::ScriptChunk;
use txforge_script::classify::{is_canonical_pubkey, is_p2ms_output};
use txforge_script::opcodes::{OP_0, OP_CHECKMULTISIG, OP_RESERVED};
use txforge_script::signature::is_canonical_script_signature;
use txforge_script::{Network, Script};

use crate::payments::PaymentOpts;
use crate::PaymentError;

/// Partial field set for bare multisig construction.
///
/// At least one of `output`, `(m, pubkeys)`, `signatures`, or `input`
/// must be supplied.
#[derive(Clone, Debug, Default)]
pub struct P2msArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// The signature threshold.
    pub m: Option<usize>,
    /// The total key count; implied by `pubkeys` when absent.
    pub n: Option<usize>,
    /// The ordered public keys.
    pub pubkeys: Option<Vec<Vec<u8>>>,
    /// Positional signature slots; `None` marks an unfilled slot.
    pub signatures: Option<Vec<Option<Vec<u8>>>>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The compiled input script.
    pub input: Option<Script>,
}

/// A bare multisig payment with lazily derived, memoized representations.
pub struct P2ms {
    args: P2msArgs,
    network: Network,
    allow_incomplete: bool,
    m: OnceCell<Option<usize>>,
    n: OnceCell<Option<usize>>,
    pubkeys: OnceCell<Option<Vec<Vec<u8>>>>,
    signatures: OnceCell<Option<Vec<Option<Vec<u8>>>>>,
    output: OnceCell<Option<Script>>,
    input: OnceCell<Option<Script>>,
}

impl P2ms {
    /// Construct with default options (validation on, complete only).
    pub fn new(args: P2msArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: P2msArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.output.is_none()
            && args.pubkeys.is_none()
            && args.signatures.is_none()
            && args.input.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2ms {
            args,
            network,
            allow_incomplete: opts.allow_incomplete,
            m: OnceCell::new(),
            n: OnceCell::new(),
            pubkeys: OnceCell::new(),
            signatures: OnceCell::new(),
            output: OnceCell::new(),
            input: OnceCell::new(),
        };
        if opts.validate {
            payment.validate()?;
        }
        Ok(payment)
    }

    /// The network this payment belongs to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Decode the supplied output script, if any.
    fn output_chunks(&self) -> Option<Vec<ScriptChunk>> {
        self.args.output.as_ref().and_then(|s| s.chunks().ok())
    }

    /// The signature threshold, from the supplied field or the output.
    pub fn m(&self) -> Option<usize> {
        *self.m.get_or_init(|| {
            if self.args.m.is_some() {
                return self.args.m;
            }
            let chunks = self.output_chunks()?;
            let op = chunks.first()?.op;
            if op > OP_RESERVED {
                Some((op - OP_RESERVED) as usize)
            } else {
                None
            }
        })
    }

    /// The total key count, from the supplied field, the pubkeys, or the
    /// output.
    pub fn n(&self) -> Option<usize> {
        *self.n.get_or_init(|| {
            if self.args.n.is_some() {
                return self.args.n;
            }
            if let Some(pubkeys) = &self.args.pubkeys {
                return Some(pubkeys.len());
            }
            let chunks = self.output_chunks()?;
            let op = chunks.get(chunks.len().checked_sub(2)?)?.op;
            if op > OP_RESERVED {
                Some((op - OP_RESERVED) as usize)
            } else {
                None
            }
        })
    }

    /// The ordered public keys, from the supplied field or the output.
    pub fn pubkeys(&self) -> Option<Vec<Vec<u8>>> {
        self.pubkeys
            .get_or_init(|| {
                if let Some(pubkeys) = &self.args.pubkeys {
                    return Some(pubkeys.clone());
                }
                let chunks = self.output_chunks()?;
                if chunks.len() < 4 {
                    return None;
                }
                chunks[1..chunks.len() - 2]
                    .iter()
                    .map(|chunk| chunk.data.clone())
                    .collect()
            })
            .clone()
    }

    /// The positional signature slots, from the supplied field or the
    /// input script (OP_0 chunks decode as unfilled slots).
    pub fn signatures(&self) -> Option<Vec<Option<Vec<u8>>>> {
        self.signatures
            .get_or_init(|| {
                if let Some(signatures) = &self.args.signatures {
                    return Some(signatures.clone());
                }
                let chunks = self.args.input.as_ref()?.chunks().ok()?;
                if chunks.is_empty() {
                    return None;
                }
                Some(
                    chunks[1..]
                        .iter()
                        .map(|chunk| chunk.data.clone())
                        .collect(),
                )
            })
            .clone()
    }

    /// The compiled output script, derivable once `m` and the pubkeys are
    /// known.
    pub fn output(&self) -> Option<Script> {
        self.output
            .get_or_init(|| {
                if let Some(output) = &self.args.output {
                    return Some(output.clone());
                }
                let m = self.args.m?;
                let pubkeys = self.args.pubkeys.clone()?;
                let n = pubkeys.len();
                if m == 0 || m > n || n > 16 {
                    return None;
                }
                let mut chunks = Vec::with_capacity(n + 3);
                chunks.push(ScriptChunk::op(OP_RESERVED + m as u8));
                chunks.extend(pubkeys.into_iter().map(ScriptChunk::push));
                chunks.push(ScriptChunk::op(OP_RESERVED + n as u8));
                chunks.push(ScriptChunk::op(OP_CHECKMULTISIG));
                Script::from_chunks(&chunks).ok()
            })
            .clone()
    }

    /// The compiled input script: `OP_0` followed by the signature slots,
    /// unfilled slots encoded as OP_0 placeholders.
    pub fn input(&self) -> Option<Script> {
        self.input
            .get_or_init(|| {
                if let Some(input) = &self.args.input {
                    return Some(input.clone());
                }
                let signatures = self.args.signatures.clone()?;
                let mut chunks = Vec::with_capacity(signatures.len() + 1);
                chunks.push(ScriptChunk::op(OP_0));
                for slot in signatures {
                    match slot {
                        Some(sig) => chunks.push(ScriptChunk::push(sig)),
                        None => chunks.push(ScriptChunk::op(OP_0)),
                    }
                }
                Script::from_chunks(&chunks).ok()
            })
            .clone()
    }

    /// The witness stack: always empty once an input exists.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.input().map(|_| Vec::new())
    }

    /// Check one signature slot against the completeness policy.
    fn is_acceptable_signature(&self, slot: &Option<Vec<u8>>) -> bool {
        match slot {
            Some(sig) => is_canonical_script_signature(sig),
            None => self.allow_incomplete,
        }
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        let mut m: Option<usize> = None;
        let mut n: Option<usize> = None;

        if let Some(output) = &self.args.output {
            let chunks = output.chunks()?;
            if !is_p2ms_output(&chunks, true) {
                return Err(PaymentError::OutputInvalid);
            }
            let derived_m = (chunks[0].op - OP_RESERVED) as usize;
            let derived_n = (chunks[chunks.len() - 2].op - OP_RESERVED) as usize;
            let derived_pubkeys: Vec<_> = chunks[1..chunks.len() - 2]
                .iter()
                .filter_map(|chunk| chunk.data.clone())
                .collect();

            if !derived_pubkeys.iter().all(|pk| is_canonical_pubkey(pk)) {
                return Err(PaymentError::PubkeyInvalid);
            }
            if let Some(supplied) = self.args.m {
                if supplied != derived_m {
                    return Err(PaymentError::MValueMismatch);
                }
            }
            if let Some(supplied) = self.args.n {
                if supplied != derived_n {
                    return Err(PaymentError::NValueMismatch);
                }
            }
            if let Some(supplied) = &self.args.pubkeys {
                if supplied != &derived_pubkeys {
                    return Err(PaymentError::PubkeyMismatch);
                }
            }
            m = Some(derived_m);
            n = Some(derived_n);
        }

        if let Some(pubkeys) = &self.args.pubkeys {
            if !pubkeys.iter().all(|pk| is_canonical_pubkey(pk)) {
                return Err(PaymentError::PubkeyInvalid);
            }
            if let Some(supplied) = self.args.n {
                if supplied != pubkeys.len() {
                    return Err(PaymentError::NValueMismatch);
                }
            }
            n = Some(pubkeys.len());
            if let Some(threshold) = self.args.m.or(m) {
                if pubkeys.len() < threshold {
                    return Err(PaymentError::PubkeyCountTooLow);
                }
            }
        }

        m = m.or(self.args.m);
        n = n.or(self.args.n);

        if let Some(signatures) = &self.args.signatures {
            if !signatures.iter().all(|slot| self.is_acceptable_signature(slot)) {
                return Err(PaymentError::SignatureInvalid);
            }
            if let Some(threshold) = m {
                if signatures.len() < threshold {
                    return Err(PaymentError::NotEnoughSignatures);
                }
                if !self.allow_incomplete && signatures.len() > threshold {
                    return Err(PaymentError::TooManySignatures);
                }
            }
        }

        if let Some(input) = &self.args.input {
            let chunks = input.chunks()?;
            match chunks.first() {
                Some(first) if first.op == OP_0 && first.data.is_none() => {}
                _ => return Err(PaymentError::InputInvalid),
            }
            let derived: Vec<Option<Vec<u8>>> =
                chunks[1..].iter().map(|chunk| chunk.data.clone()).collect();
            if derived.is_empty()
                || !derived.iter().all(|slot| self.is_acceptable_signature(slot))
            {
                return Err(PaymentError::InputInvalid);
            }
            if let Some(supplied) = &self.args.signatures {
                if supplied != &derived {
                    return Err(PaymentError::SignatureMismatch);
                }
            }
            if let Some(total) = n {
                if derived.len() > total {
                    return Err(PaymentError::TooManySignatures);
                }
            }
        }

        Ok(())
    }
}
