//! Fixed third keys for pseudo-multisig data outputs
//!
//! Every data-carrying P2MS output ends with one of the known Bitcoin Stamps
//! burn keys. None of them has a known private key, so the 1-of-3 script can
//! never be redeemed through the multisig path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const fn burn_key(prefix: u8, fill: u8, last: u8) -> [u8; 33] {
    let mut key = [fill; 33];
    key[0] = prefix;
    key[32] = last;
    key
}

/// Bitcoin Stamps burn keys (5 distinct keys)
pub const STAMPS_BURN_KEYS: [[u8; 33]; 5] = [
    burn_key(0x02, 0x22, 0x22),
    burn_key(0x03, 0x33, 0x33),
    burn_key(0x02, 0x02, 0x02),
    burn_key(0x03, 0x03, 0x02),
    burn_key(0x03, 0x03, 0x03),
];

/// Selectable burn key for the third pseudo-multisig slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StampsBurnPattern {
    /// 022222... pattern
    Stamps22,
    /// 033333... pattern
    Stamps33,
    /// 020202... alternating pattern (the key new transactions use)
    #[default]
    Stamps0202,
    /// 0303...0302 variant
    Stamps030302,
    /// 0303...0303 variant
    Stamps030303,
}

impl StampsBurnPattern {
    pub const ALL: [StampsBurnPattern; 5] = [
        StampsBurnPattern::Stamps22,
        StampsBurnPattern::Stamps33,
        StampsBurnPattern::Stamps0202,
        StampsBurnPattern::Stamps030302,
        StampsBurnPattern::Stamps030303,
    ];

    pub fn key_bytes(&self) -> [u8; 33] {
        match self {
            StampsBurnPattern::Stamps22 => STAMPS_BURN_KEYS[0],
            StampsBurnPattern::Stamps33 => STAMPS_BURN_KEYS[1],
            StampsBurnPattern::Stamps0202 => STAMPS_BURN_KEYS[2],
            StampsBurnPattern::Stamps030302 => STAMPS_BURN_KEYS[3],
            StampsBurnPattern::Stamps030303 => STAMPS_BURN_KEYS[4],
        }
    }

    pub fn key_hex(&self) -> String {
        hex::encode(self.key_bytes())
    }

    /// Identify a burn key from raw pubkey bytes
    pub fn from_pubkey(pubkey: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.key_bytes().as_slice() == pubkey)
    }
}

impl fmt::Display for StampsBurnPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_hex())
    }
}

impl FromStr for StampsBurnPattern {
    type Err = String;

    /// Accepts either the variant name or the key hex
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let by_name = match s.to_ascii_lowercase().as_str() {
            "stamps22" => Some(StampsBurnPattern::Stamps22),
            "stamps33" => Some(StampsBurnPattern::Stamps33),
            "stamps0202" => Some(StampsBurnPattern::Stamps0202),
            "stamps030302" => Some(StampsBurnPattern::Stamps030302),
            "stamps030303" => Some(StampsBurnPattern::Stamps030303),
            _ => None,
        };
        if let Some(pattern) = by_name {
            return Ok(pattern);
        }
        hex::decode(s)
            .ok()
            .and_then(|bytes| Self::from_pubkey(&bytes))
            .ok_or_else(|| format!("unknown burn key: {}", s))
    }
}

/// Check if a pubkey is a known Bitcoin Stamps burn key
pub fn is_stamps_burn_key(pubkey: &[u8]) -> bool {
    StampsBurnPattern::from_pubkey(pubkey).is_some()
}
