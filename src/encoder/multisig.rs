//! Pseudo-multisig payload encoding
//!
//! The framed payload is zero-padded to 62-byte chunks, ARC4-obfuscated with
//! the seed txid, and each chunk becomes one
//! `OP_1 <key1> <key2> <burn key> OP_3 OP_CHECKMULTISIG` output. Each data key
//! is `parity || 31 payload bytes || random byte`, regenerated until it parses
//! as a curve point.

use super::framing::{frame_payload, framed_len, pad_to_block, unframe_payload};
use crate::crypto::arc4;
use crate::crypto::pubkey::{is_valid_compressed_point, validate_pubkeys, PubkeyValidationResult};
use crate::errors::{BuildError, BuildResult};
use crate::types::StampsBurnPattern;
use bitcoin::{Script, ScriptBuf, Txid};
use rand::RngCore;
use tracing::{debug, warn};

/// Payload bytes carried per output
pub const CHUNK_BYTES: usize = 62;
/// Payload bytes carried per synthetic key
pub const SEGMENT_BYTES: usize = 31;
pub const DEFAULT_MAX_POINT_ATTEMPTS: u32 = 1024;

const OP_1: u8 = 0x51;
const OP_3: u8 = 0x53;
const OP_CHECKMULTISIG: u8 = 0xae;
const PUSH_33: u8 = 0x21;
const PSEUDO_MULTISIG_LEN: usize = 3 + 3 * 34;

/// Number of data outputs a payload of `payload_len` bytes needs
pub fn multisig_chunk_count(payload_len: usize) -> usize {
    if payload_len == 0 {
        0
    } else {
        framed_len(payload_len).div_ceil(CHUNK_BYTES)
    }
}

/// One 1-of-3 data output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoMultisigScript {
    pub data_keys: [[u8; 33]; 2],
    pub burn_key: [u8; 33],
}

impl PseudoMultisigScript {
    pub fn to_script(&self) -> ScriptBuf {
        let mut bytes = Vec::with_capacity(PSEUDO_MULTISIG_LEN);
        bytes.push(OP_1);
        for key in self.data_keys.iter().chain(std::iter::once(&self.burn_key)) {
            bytes.push(PUSH_33);
            bytes.extend_from_slice(key);
        }
        bytes.push(OP_3);
        bytes.push(OP_CHECKMULTISIG);
        ScriptBuf::from_bytes(bytes)
    }

    /// Parse the exact 1-of-3 compressed-key shape, nothing else
    pub fn from_script(script: &Script) -> Option<Self> {
        let bytes = script.as_bytes();
        if bytes.len() != PSEUDO_MULTISIG_LEN
            || bytes[0] != OP_1
            || bytes[PSEUDO_MULTISIG_LEN - 2] != OP_3
            || bytes[PSEUDO_MULTISIG_LEN - 1] != OP_CHECKMULTISIG
        {
            return None;
        }

        let mut keys = [[0u8; 33]; 3];
        for (index, key) in keys.iter_mut().enumerate() {
            let start = 1 + index * 34;
            if bytes[start] != PUSH_33 {
                return None;
            }
            key.copy_from_slice(&bytes[start + 1..start + 34]);
        }

        Some(Self {
            data_keys: [keys[0], keys[1]],
            burn_key: keys[2],
        })
    }

    /// The 62 obfuscated payload bytes this output carries
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.data_keys
            .iter()
            .flat_map(|key| key[1..1 + SEGMENT_BYTES].iter().copied())
            .collect()
    }

    pub fn validate(&self) -> PubkeyValidationResult {
        validate_pubkeys(&[self.data_keys[0], self.data_keys[1], self.burn_key])
    }
}

/// Script used to size data outputs before the seed txid is known
pub fn placeholder_script(burn_pattern: StampsBurnPattern) -> ScriptBuf {
    let burn_key = burn_pattern.key_bytes();
    PseudoMultisigScript {
        data_keys: [burn_key, burn_key],
        burn_key,
    }
    .to_script()
}

#[derive(Debug, Clone)]
pub struct PseudoMultisigEncoder {
    burn_pattern: StampsBurnPattern,
    max_attempts: u32,
}

impl Default for PseudoMultisigEncoder {
    fn default() -> Self {
        Self::new(StampsBurnPattern::default())
    }
}

impl PseudoMultisigEncoder {
    pub fn new(burn_pattern: StampsBurnPattern) -> Self {
        Self {
            burn_pattern,
            max_attempts: DEFAULT_MAX_POINT_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn burn_pattern(&self) -> StampsBurnPattern {
        self.burn_pattern
    }

    /// Encode with the thread-local RNG
    pub fn encode(&self, payload: &[u8], seed_txid: &Txid) -> BuildResult<Vec<PseudoMultisigScript>> {
        self.encode_with_rng(payload, seed_txid, &mut rand::rng())
    }

    pub fn encode_with_rng<R: RngCore>(
        &self,
        payload: &[u8],
        seed_txid: &Txid,
        rng: &mut R,
    ) -> BuildResult<Vec<PseudoMultisigScript>> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        let padded = pad_to_block(frame_payload(payload)?, CHUNK_BYTES);
        let key = arc4::key_from_txid(seed_txid);
        let obfuscated = arc4::apply_keystream(&padded, &key).ok_or_else(|| {
            BuildError::InvalidPayload("keystream key must be 32 bytes".to_string())
        })?;

        let burn_key = self.burn_pattern.key_bytes();
        let scripts = obfuscated
            .chunks(CHUNK_BYTES)
            .map(|chunk| {
                let (first, second) = chunk.split_at(SEGMENT_BYTES);
                Ok(PseudoMultisigScript {
                    data_keys: [
                        self.synthesize_key(first, rng)?,
                        self.synthesize_key(second, rng)?,
                    ],
                    burn_key,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        debug!(
            "Encoded {} payload bytes into {} pseudo-multisig outputs",
            payload.len(),
            scripts.len()
        );
        Ok(scripts)
    }

    fn synthesize_key<R: RngCore>(&self, segment: &[u8], rng: &mut R) -> BuildResult<[u8; 33]> {
        let mut candidate = [0u8; 33];
        candidate[1..1 + SEGMENT_BYTES].copy_from_slice(segment);

        for _ in 0..self.max_attempts {
            // Parity and trailing byte are drawn independently
            let mut random = [0u8; 2];
            rng.fill_bytes(&mut random);
            candidate[0] = if random[0] & 1 == 1 { 0x02 } else { 0x03 };
            candidate[32] = random[1];
            if is_valid_compressed_point(&candidate) {
                return Ok(candidate);
            }
        }

        warn!(
            "No valid curve point for segment {} after {} attempts",
            hex::encode(segment),
            self.max_attempts
        );
        Err(BuildError::PointValidationExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Recover the payload from pseudo-multisig outputs in transaction order
pub fn decode_pseudo_multisig(scripts: &[ScriptBuf], seed_txid: &Txid) -> BuildResult<Vec<u8>> {
    let mut obfuscated = Vec::with_capacity(scripts.len() * CHUNK_BYTES);
    for (index, script) in scripts.iter().enumerate() {
        let parsed = PseudoMultisigScript::from_script(script).ok_or_else(|| {
            BuildError::InvalidPayload(format!("output {} is not a pseudo-multisig script", index))
        })?;
        obfuscated.extend(parsed.payload_bytes());
    }

    let key = arc4::key_from_txid(seed_txid);
    let framed = arc4::apply_keystream(&obfuscated, &key)
        .ok_or_else(|| BuildError::InvalidPayload("keystream key must be 32 bytes".to_string()))?;
    let (_, payload) = unframe_payload(&framed)?;
    Ok(payload)
}
