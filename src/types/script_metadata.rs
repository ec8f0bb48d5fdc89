//! Script kinds recognised by the classifier
//!
//! This is the normalised representation used across selection, assembly and
//! the provider layer. Provider-specific spellings (`pubkeyhash`,
//! `witness_v0_keyhash`, ...) are folded in by `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bitcoin script types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Pay-to-PubKey-Hash (standard address)
    P2PKH,
    /// Pay-to-Script-Hash (assumed to wrap P2WPKH when spent)
    P2SH,
    /// Pay-to-Witness-PubKey-Hash (SegWit)
    P2WPKH,
    /// Pay-to-Witness-Script-Hash (SegWit)
    P2WSH,
    /// Pay-to-Taproot
    P2TR,
    /// Bare multisig, including pseudo-multisig data carriers
    Multisig,
    /// Anything else
    Unknown,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::P2PKH => "p2pkh",
            ScriptType::P2SH => "p2sh",
            ScriptType::P2WPKH => "p2wpkh",
            ScriptType::P2WSH => "p2wsh",
            ScriptType::P2TR => "p2tr",
            ScriptType::Multisig => "multisig",
            ScriptType::Unknown => "unknown",
        }
    }

    /// Whether spending this kind populates a PSBT `witness_utxo`
    ///
    /// P2SH is treated as nested SegWit, so the full parent transaction is
    /// only required for P2PKH, bare multisig and unrecognised scripts.
    pub fn is_witness(&self) -> bool {
        matches!(
            self,
            ScriptType::P2WPKH | ScriptType::P2WSH | ScriptType::P2TR | ScriptType::P2SH
        )
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = std::convert::Infallible;

    /// Infallible - unrecognised strings return `ScriptType::Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "p2pkh" | "pubkeyhash" => ScriptType::P2PKH,
            "p2sh" | "scripthash" => ScriptType::P2SH,
            "p2wpkh" | "witness_v0_keyhash" | "v0_p2wpkh" => ScriptType::P2WPKH,
            "p2wsh" | "witness_v0_scripthash" | "v0_p2wsh" => ScriptType::P2WSH,
            "p2tr" | "witness_v1_taproot" | "v1_p2tr" => ScriptType::P2TR,
            "multisig" | "p2ms" => ScriptType::Multisig,
            _ => ScriptType::Unknown,
        })
    }
}
