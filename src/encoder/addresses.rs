//! Address-output payload variant
//!
//! The framed payload is padded to 32-byte blocks and hex-encoded; an
//! addressing collaborator turns that hex string into one P2WSH-style address
//! per block. Each data address receives a small dust output.

use super::framing::{frame_payload, framed_len, pad_to_block, unframe_payload};
use crate::errors::{BuildError, BuildResult};
use bitcoin::{Address, Network, ScriptBuf};

pub const ADDRESS_BLOCK_BYTES: usize = 32;

/// Maps a canonical hex payload to addresses, deterministically
pub trait AddressingCollaborator: Send + Sync {
    fn bytes_to_addresses(&self, hex_payload: &str) -> BuildResult<Vec<String>>;
}

/// Canonical hex string handed to the addressing collaborator
pub fn prepare_address_payload(payload: &[u8]) -> BuildResult<String> {
    Ok(hex::encode(pad_to_block(
        frame_payload(payload)?,
        ADDRESS_BLOCK_BYTES,
    )))
}

pub fn address_output_count(payload_len: usize) -> usize {
    if payload_len == 0 {
        0
    } else {
        framed_len(payload_len).div_ceil(ADDRESS_BLOCK_BYTES)
    }
}

pub fn encode_as_addresses(
    payload: &[u8],
    collaborator: &dyn AddressingCollaborator,
) -> BuildResult<Vec<String>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    collaborator.bytes_to_addresses(&prepare_address_payload(payload)?)
}

/// Every 32-byte block becomes a version-0 witness program
#[derive(Debug, Clone)]
pub struct WitnessProgramAddressing {
    network: Network,
}

impl WitnessProgramAddressing {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Inverse of `bytes_to_addresses` followed by unframing
    pub fn decode_addresses(&self, addresses: &[String]) -> BuildResult<Vec<u8>> {
        let mut framed = Vec::with_capacity(addresses.len() * ADDRESS_BLOCK_BYTES);
        for address in addresses {
            let script = crate::script::require_address(address, self.network)?.script_pubkey();
            let bytes = script.as_bytes();
            if bytes.len() != 2 + ADDRESS_BLOCK_BYTES || bytes[0] != 0x00 || bytes[1] != 0x20 {
                return Err(BuildError::InvalidPayload(format!(
                    "{} is not a 32-byte v0 witness program",
                    address
                )));
            }
            framed.extend_from_slice(&bytes[2..]);
        }
        let (_, payload) = unframe_payload(&framed)?;
        Ok(payload)
    }
}

impl AddressingCollaborator for WitnessProgramAddressing {
    fn bytes_to_addresses(&self, hex_payload: &str) -> BuildResult<Vec<String>> {
        let bytes = hex::decode(hex_payload)
            .map_err(|e| BuildError::InvalidPayload(format!("payload is not hex: {}", e)))?;
        if bytes.len() % ADDRESS_BLOCK_BYTES != 0 {
            return Err(BuildError::InvalidPayload(format!(
                "payload length {} is not a multiple of {}",
                bytes.len(),
                ADDRESS_BLOCK_BYTES
            )));
        }

        bytes
            .chunks(ADDRESS_BLOCK_BYTES)
            .map(|block| {
                let mut script = Vec::with_capacity(2 + ADDRESS_BLOCK_BYTES);
                script.extend_from_slice(&[0x00, 0x20]);
                script.extend_from_slice(block);
                Address::from_script(&ScriptBuf::from_bytes(script), self.network)
                    .map(|address| address.to_string())
                    .map_err(|e| BuildError::UnsupportedScriptType(e.to_string()))
            })
            .collect()
    }
}
