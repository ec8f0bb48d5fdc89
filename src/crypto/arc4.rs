//! ARC4 keystream transform around the `rc4` crate
//!
//! Stamps payloads are obfuscated with ARC4 keyed by the first input's
//! transaction id before being split into synthetic public keys. ARC4 is
//! symmetric and length-preserving, so the same call encodes and decodes.
//!
//! ```rust
//! use data_carry_builder::crypto::arc4;
//!
//! let key = [0x5au8; 32];
//! let encrypted = arc4::apply_keystream(b"hello world", &key).unwrap();
//! assert_eq!(encrypted.len(), 11);
//! assert_eq!(arc4::apply_keystream(&encrypted, &key).unwrap(), b"hello world");
//! ```
use bitcoin::hashes::Hash;
use bitcoin::Txid;
use rc4::{consts::U32, Key, KeyInit, Rc4, StreamCipher};

/// Apply the ARC4 keystream derived from `key` to `data`
///
/// Returns `None` if the key is not exactly 32 bytes. Empty input yields
/// empty output.
pub fn apply_keystream(data: &[u8], key: &[u8]) -> Option<Vec<u8>> {
    if key.len() != 32 {
        return None;
    }

    let rc4_key = Key::<U32>::from_slice(key);
    let mut cipher = Rc4::new(rc4_key);
    let mut result = data.to_vec();
    cipher.apply_keystream(&mut result);

    Some(result)
}

/// ARC4 key for a transaction id
///
/// The key is the txid as it is displayed (big-endian hex), not the
/// internal little-endian byte order.
pub fn key_from_txid(txid: &Txid) -> [u8; 32] {
    let mut key = txid.to_byte_array();
    key.reverse();
    key
}
