/// txforge script layer - parsing, classification, and address handling.
///
/// Provides the Bitcoin `Script` type, opcode definitions, script chunk
/// parsing, output/input/witness classification against the canonical
/// script templates, the BIP66 script-signature codec, network parameters,
/// and address generation/validation.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod classify;
pub mod signature;
pub mod network;
pub mod address;

mod error;
pub use chunk::ScriptChunk;
pub use classify::ScriptType;
pub use error::ScriptError;
pub use network::Network;
pub use script::Script;
pub use signature::ScriptSignature;
