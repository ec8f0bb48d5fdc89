//! Bitcoin Stamps Transaction Builder
//!
//! Builds unsigned transactions that carry a stamp payload in pseudo-multisig
//! or witness-program outputs: coin selection, payload encoding, PSBT
//! assembly, and a retrying multi-provider data layer feeding them.

pub mod assembly;
pub mod builder;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod encoder;
pub mod errors;
pub mod provider;
pub mod script;
pub mod selection;
pub mod types;
