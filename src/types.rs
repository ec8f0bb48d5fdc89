//! Bitcoin Stamps Transaction Builder - Type System
//!
//! - `utxo`: spendable outputs, ancestor info, requested outputs and `txid:vout` parsing
//! - `script_metadata`: normalised script kinds shared by every stage
//! - `burn_patterns`: the fixed third keys used by pseudo-multisig data outputs
//! - `stamps`: the payload signature written in front of every framed payload

pub mod burn_patterns;
pub mod script_metadata;
pub mod stamps;
mod utxo;

pub use burn_patterns::StampsBurnPattern;
pub use script_metadata::ScriptType;
pub use stamps::StampSignature;
pub use utxo::{parse_utxo_ref, AncestorInfo, OutputRequest, Utxo};
