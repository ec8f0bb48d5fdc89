//! Curve-point validation for synthetic public keys
//!
//! The pseudo-multisig encoder only emits keys that parse as compressed
//! secp256k1 points, so the resulting scripts look like ordinary multisig to
//! relay policy.

use bitcoin::secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

/// True if `bytes` is a 33-byte compressed key whose x-coordinate is on the curve
pub fn is_valid_compressed_point(bytes: &[u8]) -> bool {
    bytes.len() == 33 && matches!(bytes[0], 0x02 | 0x03) && PublicKey::from_slice(bytes).is_ok()
}

/// Result of validating the keys of one pseudo-multisig output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubkeyValidationResult {
    /// True if all public keys are valid EC points on secp256k1 curve
    pub all_valid_ec_points: bool,

    /// Indices of invalid public keys (0-based)
    pub invalid_key_indices: Vec<usize>,

    pub total_keys: usize,
    pub valid_keys: usize,
}

impl PubkeyValidationResult {
    pub fn summary(&self) -> String {
        if self.all_valid_ec_points {
            format!("All {} keys are valid EC points", self.total_keys)
        } else {
            format!(
                "{}/{} keys valid, invalid at {:?}",
                self.valid_keys, self.total_keys, self.invalid_key_indices
            )
        }
    }
}

/// Validate a list of keys
pub fn validate_pubkeys<K: AsRef<[u8]>>(keys: &[K]) -> PubkeyValidationResult {
    let invalid_key_indices: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| !is_valid_compressed_point(key.as_ref()))
        .map(|(index, _)| index)
        .collect();

    PubkeyValidationResult {
        all_valid_ec_points: invalid_key_indices.is_empty(),
        total_keys: keys.len(),
        valid_keys: keys.len() - invalid_key_indices.len(),
        invalid_key_indices,
    }
}
