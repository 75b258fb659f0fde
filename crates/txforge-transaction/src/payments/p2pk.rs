//! Pay-to-public-key template.
//!
//! output: `{pubkey} OP_CHECKSIG`
//! input:  `{signature}`

use std::cell::OnceCell;

use txforge_script::chunk::ScriptChunk;
use txforge_script::classify::{is_canonical_pubkey, is_p2pk_output};
use txforge_script::signature::is_canonical_script_signature;
use txforge_script::{Network, Script};

use crate::payments::PaymentOpts;
use crate::PaymentError;

/// Partial field set for P2PK construction.
///
/// At least one of `output`, `pubkey`, `signature`, or `input` must be
/// supplied.
#[derive(Clone, Debug, Default)]
pub struct P2pkArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// The compiled output script.
    pub output: Option<Script>,
    /// The public key.
    pub pubkey: Option<Vec<u8>>,
    /// The wire signature (DER plus sighash byte).
    pub signature: Option<Vec<u8>>,
    /// The compiled input script.
    pub input: Option<Script>,
}

/// A P2PK payment with lazily derived, memoized representations.
pub struct P2pk {
    args: P2pkArgs,
    network: Network,
    output: OnceCell<Option<Script>>,
    pubkey: OnceCell<Option<Vec<u8>>>,
    signature: OnceCell<Option<Vec<u8>>>,
    input: OnceCell<Option<Script>>,
}

impl P2pk {
    /// Construct with default options (validation on).
    pub fn new(args: P2pkArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: P2pkArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.output.is_none()
            && args.pubkey.is_none()
            && args.signature.is_none()
            && args.input.is_none()
        {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = P2pk {
            args,
            network,
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

    /// The network this payment belongs to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The public key, from the supplied field or the output script.
    pub fn pubkey(&self) -> Option<Vec<u8>> {
        self.pubkey
            .get_or_init(|| {
                if let Some(pubkey) = &self.args.pubkey {
                    return Some(pubkey.clone());
                }
                let chunks = self.args.output.as_ref()?.chunks().ok()?;
                chunks.first().and_then(|chunk| chunk.data.clone())
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
                let pubkey = self.pubkey()?;
                let mut script = Script::from_chunks(&[ScriptChunk::push(pubkey)]).ok()?;
                script
                    .append_opcodes(&[txforge_script::opcodes::OP_CHECKSIG])
                    .ok()?;
                Some(script)
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
                let chunks = self.args.input.as_ref()?.chunks().ok()?;
                chunks.first().and_then(|chunk| chunk.data.clone())
            })
            .clone()
    }

    /// The compiled input script, from the supplied field or the signature.
    pub fn input(&self) -> Option<Script> {
        self.input
            .get_or_init(|| {
                if let Some(input) = &self.args.input {
                    return Some(input.clone());
                }
                let signature = self.signature()?;
                Script::from_chunks(&[ScriptChunk::push(signature)]).ok()
            })
            .clone()
    }

    /// The witness stack: always empty once an input exists.
    pub fn witness(&self) -> Option<Vec<Vec<u8>>> {
        self.input().map(|_| Vec::new())
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        if let Some(output) = &self.args.output {
            let chunks = output.chunks()?;
            if !is_p2pk_output(&chunks) {
                return Err(PaymentError::OutputInvalid);
            }
            if let Some(supplied) = &self.args.pubkey {
                let output_pubkey = chunks[0].data.as_ref().ok_or(PaymentError::OutputInvalid)?;
                if supplied != output_pubkey {
                    return Err(PaymentError::PubkeyMismatch);
                }
            }
        }

        if let Some(pubkey) = &self.args.pubkey {
            if !is_canonical_pubkey(pubkey) {
                return Err(PaymentError::PubkeyInvalid);
            }
        }

        if let Some(signature) = &self.args.signature {
            if !is_canonical_script_signature(signature) {
                return Err(PaymentError::SignatureInvalid);
            }
        }

        if let Some(input) = &self.args.input {
            let chunks = input.chunks()?;
            if chunks.len() != 1 {
                return Err(PaymentError::InputInvalid);
            }
            let sig = chunks[0].data.as_ref().ok_or(PaymentError::InputInvalid)?;
            if !is_canonical_script_signature(sig) {
                return Err(PaymentError::SignatureInvalid);
            }
            if let Some(supplied) = &self.args.signature {
                if supplied != sig {
                    return Err(PaymentError::SignatureMismatch);
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

    /// Verify pubkey <-> output derivation in both directions.
    #[test]
    fn test_pubkey_output_roundtrip() {
        let pubkey = hex::decode(PUBKEY).expect("valid hex");
        let forward = P2pk::new(P2pkArgs {
            pubkey: Some(pubkey.clone()),
            ..Default::default()
        })
        .expect("should construct");
        let output = forward.output().expect("derives output");
        assert_eq!(output.len(), 35);

        let backward = P2pk::new(P2pkArgs {
            output: Some(output),
            ..Default::default()
        })
        .expect("should construct");
        assert_eq!(backward.pubkey().expect("recovers pubkey"), pubkey);
    }

    /// Verify signature -> input derivation and recovery.
    #[test]
    fn test_signature_input_roundtrip() {
        let sig = wire_signature();
        let forward = P2pk::new(P2pkArgs {
            signature: Some(sig.clone()),
            ..Default::default()
        })
        .expect("should construct");
        let input = forward.input().expect("derives input");

        let backward = P2pk::new(P2pkArgs {
            input: Some(input),
            ..Default::default()
        })
        .expect("should construct");
        assert_eq!(backward.signature().expect("recovers signature"), sig);
    }

    /// Verify construction fails with no informative field.
    #[test]
    fn test_not_enough_data() {
        assert!(matches!(
            P2pk::new(P2pkArgs::default()),
            Err(PaymentError::NotEnoughData)
        ));
    }

    /// Verify a pubkey disagreeing with the output is rejected.
    #[test]
    fn test_pubkey_mismatch() {
        let pubkey = hex::decode(PUBKEY).expect("valid hex");
        let other =
            hex::decode("02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5")
                .expect("valid hex");
        let output = P2pk::new(P2pkArgs {
            pubkey: Some(pubkey),
            ..Default::default()
        })
        .expect("should construct")
        .output()
        .expect("derives output");

        let result = P2pk::new(P2pkArgs {
            output: Some(output),
            pubkey: Some(other),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::PubkeyMismatch)));
    }

    /// Verify a non-canonical signature is rejected.
    #[test]
    fn test_signature_invalid() {
        let result = P2pk::new(P2pkArgs {
            signature: Some(vec![0x01, 0x02, 0x03]),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::SignatureInvalid)));
    }
}
