//! Bitcoin Stamps payload signatures
//!
//! Every framed payload carries a signature immediately after its length
//! prefix. New payloads are always written with the canonical `stamp:`; the
//! decoder also tolerates the variants seen on chain.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StampSignature {
    /// "stamp:" - canonical, used for everything this crate encodes
    StampLower,
    /// "STAMP:"
    StampUpper,
    /// "stamps:"
    StampsLower,
    /// "STAMPS:"
    StampsUpper,
}

impl StampSignature {
    /// Longest variant first so `stamps:` is not mistaken for `stamp` + `s:`
    pub const ALL: [StampSignature; 4] = [
        Self::StampsLower,
        Self::StampsUpper,
        Self::StampLower,
        Self::StampUpper,
    ];

    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::StampLower => b"stamp:",
            Self::StampUpper => b"STAMP:",
            Self::StampsLower => b"stamps:",
            Self::StampsUpper => b"STAMPS:",
        }
    }

    pub const fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Signature found at the very start of `data`, if any
    pub fn detect_prefix(data: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|sig| data.starts_with(sig.as_bytes()))
    }
}

impl std::fmt::Display for StampSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}
