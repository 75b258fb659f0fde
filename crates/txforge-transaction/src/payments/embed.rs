//! Null-data (data carrier) template.
//!
//! output: `OP_RETURN {data}...`
//!
//! Purely one-directional: the output is provably unspendable, so there
//! is no input or witness side.

use std::cell::OnceCell;

use txforge_script::chunk::ScriptChunk;
use txforge_script::opcodes::OP_RETURN;
use txforge_script::{Network, Script};

use crate::payments::{stacks_equal, PaymentOpts};
use crate::PaymentError;

/// Partial field set for null-data construction.
///
/// At least one of `data` or `output` must be supplied.
#[derive(Clone, Debug, Default)]
pub struct EmbedArgs {
    /// Network parameters; mainnet when absent.
    pub network: Option<Network>,
    /// The data payloads pushed after OP_RETURN.
    pub data: Option<Vec<Vec<u8>>>,
    /// The compiled output script.
    pub output: Option<Script>,
}

/// A null-data payment with lazily derived, memoized representations.
pub struct Embed {
    args: EmbedArgs,
    network: Network,
    data: OnceCell<Option<Vec<Vec<u8>>>>,
    output: OnceCell<Option<Script>>,
}

impl Embed {
    /// Construct with default options (validation on).
    ///
    /// # Arguments
    /// * `args` - The partial field set.
    ///
    /// # Returns
    /// The payment, or a `PaymentError` naming the inconsistency.
    pub fn new(args: EmbedArgs) -> Result<Self, PaymentError> {
        Self::with_opts(args, &PaymentOpts::default())
    }

    /// Construct with explicit options.
    pub fn with_opts(args: EmbedArgs, opts: &PaymentOpts) -> Result<Self, PaymentError> {
        if args.data.is_none() && args.output.is_none() {
            return Err(PaymentError::NotEnoughData);
        }

        let network = args.network.unwrap_or(Network::MAINNET);
        let payment = Embed {
            args,
            network,
            data: OnceCell::new(),
            output: OnceCell::new(),
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

    /// The data payloads, from the supplied field or the output script.
    pub fn data(&self) -> Option<Vec<Vec<u8>>> {
        self.data
            .get_or_init(|| {
                if let Some(data) = &self.args.data {
                    return Some(data.clone());
                }
                let chunks = self.args.output.as_ref()?.chunks().ok()?;
                chunks[1..]
                    .iter()
                    .map(|chunk| chunk.data.clone())
                    .collect()
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
                let data = self.args.data.clone()?;
                let mut chunks = Vec::with_capacity(data.len() + 1);
                chunks.push(ScriptChunk::op(OP_RETURN));
                chunks.extend(data.into_iter().map(ScriptChunk::push));
                Script::from_chunks(&chunks).ok()
            })
            .clone()
    }

    /// Cross-validate every supplied field pair.
    fn validate(&self) -> Result<(), PaymentError> {
        if let Some(output) = &self.args.output {
            let chunks = output.chunks()?;
            match chunks.first() {
                Some(first) if first.op == OP_RETURN && first.data.is_none() => {}
                _ => return Err(PaymentError::OutputInvalid),
            }
            let derived: Option<Vec<Vec<u8>>> = chunks[1..]
                .iter()
                .map(|chunk| chunk.data.clone())
                .collect();
            let derived = derived.ok_or(PaymentError::OutputInvalid)?;
            if let Some(supplied) = &self.args.data {
                if !stacks_equal(supplied, &derived) {
                    return Err(PaymentError::DataMismatch);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify data -> output derivation and the reverse.
    #[test]
    fn test_data_roundtrip() {
        let data = vec![b"charley loves heidi".to_vec()];
        let forward = Embed::new(EmbedArgs {
            data: Some(data.clone()),
            ..Default::default()
        })
        .expect("should construct");

        let output = forward.output().expect("derives output");
        assert_eq!(output.to_bytes()[0], OP_RETURN);

        let backward = Embed::new(EmbedArgs {
            output: Some(output),
            ..Default::default()
        })
        .expect("should construct");
        assert_eq!(backward.data().expect("recovers data"), data);
    }

    /// Verify multiple pushes survive the round-trip in order.
    #[test]
    fn test_multiple_pushes() {
        let data = vec![vec![0xde, 0xad], vec![0xbe, 0xef, 0x00], vec![0x42; 80]];
        let payment = Embed::new(EmbedArgs {
            data: Some(data.clone()),
            ..Default::default()
        })
        .expect("should construct");

        let recovered = Embed::new(EmbedArgs {
            output: payment.output(),
            ..Default::default()
        })
        .expect("should construct");
        assert_eq!(recovered.data().expect("recovers data"), data);
    }

    /// Verify an output not starting with OP_RETURN is rejected.
    #[test]
    fn test_output_invalid() {
        let result = Embed::new(EmbedArgs {
            output: Some(Script::from_asm("OP_DUP OP_DROP").expect("valid ASM")),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::OutputInvalid)));
    }

    /// Verify a data disagreement against the output script fails.
    #[test]
    fn test_data_mismatch() {
        let output = Embed::new(EmbedArgs {
            data: Some(vec![vec![0x01, 0x02, 0x03, 0x04, 0x05]]),
            ..Default::default()
        })
        .expect("should construct")
        .output();

        let result = Embed::new(EmbedArgs {
            output,
            data: Some(vec![vec![0xff; 5]]),
            ..Default::default()
        });
        assert!(matches!(result, Err(PaymentError::DataMismatch)));
    }

    /// Verify construction fails with no informative field.
    #[test]
    fn test_not_enough_data() {
        assert!(matches!(
            Embed::new(EmbedArgs::default()),
            Err(PaymentError::NotEnoughData)
        ));
    }
}
