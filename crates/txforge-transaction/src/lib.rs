/// txforge transaction layer - construction, templates, and signing.
///
/// Provides the Transaction type with witness-aware wire serialization,
/// legacy and BIP143 signature hashing, the payment templates for the
/// canonical script patterns, and the TransactionBuilder that accumulates
/// signatures across inputs while guarding committed state.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod payments;
pub mod builder;

mod error;
pub use builder::{SignOptions, TransactionBuilder};
pub use error::{BuildError, PaymentError, TransactionError};
pub use input::TxInput;
pub use output::TxOutput;
pub use transaction::Transaction;
