//! Pre-framing payload encoders
//!
//! The codec itself never compresses. Callers pick an encoder and hand its
//! output to framing.

use crate::errors::{BuildError, BuildResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

pub trait PayloadEncoder: Send + Sync {
    fn encode(&self, payload: &[u8]) -> BuildResult<Vec<u8>>;
}

/// Payload goes out exactly as supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PayloadEncoder for PassThrough {
    fn encode(&self, payload: &[u8]) -> BuildResult<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// zlib, kept only when it actually shrinks the payload
#[derive(Debug, Clone, Copy)]
pub struct ZlibPayloadEncoder {
    level: u32,
}

impl Default for ZlibPayloadEncoder {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ZlibPayloadEncoder {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl PayloadEncoder for ZlibPayloadEncoder {
    fn encode(&self, payload: &[u8]) -> BuildResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(payload)
            .map_err(|e| BuildError::InvalidPayload(format!("zlib write failed: {}", e)))?;
        let compressed = encoder
            .finish()
            .map_err(|e| BuildError::InvalidPayload(format!("zlib finish failed: {}", e)))?;

        if compressed.len() < payload.len() {
            debug!(
                "zlib reduced payload from {} to {} bytes",
                payload.len(),
                compressed.len()
            );
            Ok(compressed)
        } else {
            Ok(payload.to_vec())
        }
    }
}

/// JSON payload re-encoded as MessagePack, then zlib if that is smaller still
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackJsonEncoder {
    zlib: ZlibPayloadEncoder,
}

impl PayloadEncoder for MsgpackJsonEncoder {
    fn encode(&self, payload: &[u8]) -> BuildResult<Vec<u8>> {
        let json: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| BuildError::InvalidPayload(format!("payload is not JSON: {}", e)))?;

        let mut packed = Vec::new();
        rmpv::encode::write_value(&mut packed, &json_to_msgpack(&json))
            .map_err(|e| BuildError::InvalidPayload(format!("msgpack encode failed: {}", e)))?;

        let compressed = self.zlib.encode(&packed)?;
        if compressed.len() < payload.len() {
            Ok(compressed)
        } else {
            Ok(payload.to_vec())
        }
    }
}

fn json_to_msgpack(value: &serde_json::Value) -> rmpv::Value {
    match value {
        serde_json::Value::Null => rmpv::Value::Nil,
        serde_json::Value::Bool(b) => rmpv::Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rmpv::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                rmpv::Value::from(u)
            } else {
                rmpv::Value::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => rmpv::Value::from(s.as_str()),
        serde_json::Value::Array(items) => {
            rmpv::Value::Array(items.iter().map(json_to_msgpack).collect())
        }
        serde_json::Value::Object(map) => rmpv::Value::Map(
            map.iter()
                .map(|(k, v)| (rmpv::Value::from(k.as_str()), json_to_msgpack(v)))
                .collect(),
        ),
    }
}

/// Undo zlib if the data is a zlib stream, otherwise return it unchanged
pub fn inflate_if_compressed(data: &[u8]) -> Vec<u8> {
    let mut decoder = ZlibDecoder::new(data);
    let mut inflated = Vec::new();
    match decoder.read_to_end(&mut inflated) {
        Ok(_) if !inflated.is_empty() => inflated,
        _ => data.to_vec(),
    }
}
