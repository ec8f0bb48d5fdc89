//! Canonical payload framing shared by both output variants
//!
//! Layout: `len(2, big-endian) || "stamp:" || payload`, where `len` covers the
//! signature and payload. Callers pad the frame to their block size with
//! trailing zero bytes; the length prefix makes the padding removable.

use crate::errors::{BuildError, BuildResult};
use crate::types::StampSignature;
use byteorder::{BigEndian, ByteOrder};

pub const LENGTH_PREFIX_BYTES: usize = 2;

/// Largest signature + payload the 2-byte prefix can describe
pub const MAX_FRAMED_LEN: usize = u16::MAX as usize;

/// Length of the framed value including its prefix
pub fn framed_len(payload_len: usize) -> usize {
    LENGTH_PREFIX_BYTES + StampSignature::StampLower.len() + payload_len
}

pub fn frame_payload(payload: &[u8]) -> BuildResult<Vec<u8>> {
    let signature = StampSignature::StampLower.as_bytes();
    let body_len = signature.len() + payload.len();
    if body_len > MAX_FRAMED_LEN {
        return Err(BuildError::PayloadTooLarge {
            size: body_len,
            max: MAX_FRAMED_LEN,
        });
    }

    let mut framed = vec![0u8; LENGTH_PREFIX_BYTES];
    BigEndian::write_u16(&mut framed, body_len as u16);
    framed.reserve(body_len);
    framed.extend_from_slice(signature);
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Zero-pad to a multiple of `block` bytes
pub fn pad_to_block(mut data: Vec<u8>, block: usize) -> Vec<u8> {
    let remainder = data.len() % block;
    if remainder != 0 {
        data.resize(data.len() + block - remainder, 0);
    }
    data
}

/// Strip prefix, signature and padding, returning the signature found and the payload
pub fn unframe_payload(data: &[u8]) -> BuildResult<(StampSignature, Vec<u8>)> {
    if data.len() < LENGTH_PREFIX_BYTES {
        return Err(BuildError::InvalidPayload(
            "missing length prefix".to_string(),
        ));
    }

    let declared = BigEndian::read_u16(&data[..LENGTH_PREFIX_BYTES]) as usize;
    let body = &data[LENGTH_PREFIX_BYTES..];
    if declared > body.len() {
        return Err(BuildError::InvalidPayload(format!(
            "length prefix {} exceeds {} available bytes",
            declared,
            body.len()
        )));
    }

    let body = &body[..declared];
    let signature = StampSignature::detect_prefix(body)
        .ok_or_else(|| BuildError::InvalidPayload("missing stamp signature".to_string()))?;

    Ok((signature, body[signature.len()..].to_vec()))
}
