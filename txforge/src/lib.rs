#![deny(missing_docs)]

//! txforge - Bitcoin transaction construction toolkit.
//!
//! Re-exports all txforge components for convenient single-crate usage.

pub use txforge_primitives as primitives;
pub use txforge_script as script;
pub use txforge_transaction as transaction;
