//! Payment templates for the canonical script patterns.
//!
//! Each template accepts a partial field set, validates every pair of
//! supplied fields that cross-determine a third, and lazily derives the
//! remaining representations on first access. Derived values are
//! memoized in write-once slots; a constructed payment is immutable.
//!
//! Construction fails with `NotEnoughData` when no informative field is
//! supplied, and with a named mismatch error when two supplied sources
//! disagree. Validation runs eagerly at construction (it can be switched
//! off for internal reassembly of known-good parts); lazy accessors on an
//! unvalidated payment return `None` rather than failing when a
//! derivation is unsupported by the supplied fields.

pub mod embed;
pub mod p2ms;
pub mod p2pk;
pub mod p2pkh;
pub mod p2sh;
pub mod p2wpkh;
pub mod p2wsh;

pub use embed::{Embed, EmbedArgs};
pub use p2ms::{P2ms, P2msArgs};
pub use p2pk::{P2pk, P2pkArgs};
pub use p2pkh::{P2pkh, P2pkhArgs};
pub use p2sh::{P2sh, P2shArgs};
pub use p2wpkh::{P2wpkh, P2wpkhArgs};
pub use p2wsh::{P2wsh, P2wshArgs};

use txforge_script::Script;

/// Construction options shared by every template.
#[derive(Clone, Copy, Debug)]
pub struct PaymentOpts {
    /// Run cross-consistency validation at construction. Defaults to on.
    pub validate: bool,
    /// Accept placeholder (missing) signatures in multisig construction.
    pub allow_incomplete: bool,
}

impl Default for PaymentOpts {
    fn default() -> Self {
        PaymentOpts {
            validate: true,
            allow_incomplete: false,
        }
    }
}

/// The pieces of a nested redeem: the script whose hash the outer
/// payment commits to, plus whichever unlocking data is known for it.
///
/// A satisfied redeem carries either a push-only `input` script (legacy
/// P2SH) or a `witness` stack (P2WSH, or a witness program nested in
/// P2SH), never both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedeemParts {
    /// The redeem or witness script itself.
    pub output: Option<Script>,
    /// The redeem's own scriptSig.
    pub input: Option<Script>,
    /// The redeem's witness stack.
    pub witness: Option<Vec<Vec<u8>>>,
}

/// Compare two witness stacks element-wise.
pub(crate) fn stacks_equal(a: &[Vec<u8>], b: &[Vec<u8>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}
