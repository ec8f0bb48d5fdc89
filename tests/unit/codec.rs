use crate::common::fixtures::parent_tx;
use crate::common::SOURCE_SCRIPT;
use bitcoin::hashes::Hash;
use bitcoin::{ScriptBuf, Txid};
use data_carry_builder::crypto::arc4::{apply_keystream, key_from_txid};
use data_carry_builder::encoder::{
    address_output_count, decode_pseudo_multisig, encode_as_addresses, frame_payload,
    multisig_chunk_count, pad_to_block, prepare_address_payload, unframe_payload,
    PseudoMultisigEncoder, WitnessProgramAddressing,
};
use data_carry_builder::errors::BuildError;
use data_carry_builder::types::StampSignature;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn seed() -> Txid {
    parent_tx(SOURCE_SCRIPT, &[10_000], 1).compute_txid()
}

#[test]
fn test_round_trip_across_chunk_boundaries() {
    // 54 payload bytes fill one 62-byte chunk exactly; 55 spills into a second
    let encoder = PseudoMultisigEncoder::default();
    let mut rng = StdRng::seed_from_u64(7);
    for len in [1usize, 54, 55, 200, 1_000] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let scripts = encoder.encode_with_rng(&payload, &seed(), &mut rng).unwrap();
        assert_eq!(scripts.len(), multisig_chunk_count(len), "len {}", len);

        let raw: Vec<ScriptBuf> = scripts.iter().map(|s| s.to_script()).collect();
        assert_eq!(decode_pseudo_multisig(&raw, &seed()).unwrap(), payload);
    }
}

#[test]
fn test_wrong_seed_does_not_decode() {
    let scripts: Vec<ScriptBuf> = PseudoMultisigEncoder::default()
        .encode_with_rng(b"stamp data", &seed(), &mut StdRng::seed_from_u64(3))
        .unwrap()
        .iter()
        .map(|s| s.to_script())
        .collect();

    let other = Txid::from_byte_array([0x42; 32]);
    assert!(matches!(
        decode_pseudo_multisig(&scripts, &other),
        Err(BuildError::InvalidPayload(_))
    ));
}

#[test]
fn test_keystream_preserves_length_and_inverts() {
    let key = key_from_txid(&seed());
    let data = pad_to_block(frame_payload(b"keystream").unwrap(), 62);
    let encrypted = apply_keystream(&data, &key).unwrap();
    assert_eq!(encrypted.len(), data.len());
    assert_ne!(encrypted, data);
    assert_eq!(apply_keystream(&encrypted, &key).unwrap(), data);
}

#[test]
fn test_padding_is_removable() {
    let framed = pad_to_block(frame_payload(b"padded").unwrap(), 62);
    assert_eq!(framed.len(), 62);
    let (signature, payload) = unframe_payload(&framed).unwrap();
    assert_eq!(signature, StampSignature::StampLower);
    assert_eq!(payload, b"padded".to_vec());
}

#[test]
fn test_payload_with_trailing_zeros_survives() {
    let payload = vec![1u8, 2, 3, 0, 0, 0];
    let scripts: Vec<ScriptBuf> = PseudoMultisigEncoder::default()
        .encode_with_rng(&payload, &seed(), &mut StdRng::seed_from_u64(9))
        .unwrap()
        .iter()
        .map(|s| s.to_script())
        .collect();
    assert_eq!(decode_pseudo_multisig(&scripts, &seed()).unwrap(), payload);
}

#[test]
fn test_empty_payload_encodes_to_nothing() {
    let scripts = PseudoMultisigEncoder::default()
        .encode(b"", &seed())
        .unwrap();
    assert!(scripts.is_empty());
    assert!(encode_as_addresses(b"", &WitnessProgramAddressing::new(bitcoin::Network::Bitcoin))
        .unwrap()
        .is_empty());
}

#[test]
fn test_address_variant_round_trip() {
    let payload = b"an address-embedded stamp payload that spans blocks".to_vec();
    let addressing = WitnessProgramAddressing::new(bitcoin::Network::Bitcoin);

    let hex_payload = prepare_address_payload(&payload).unwrap();
    assert_eq!(hex_payload.len() % 64, 0);

    let addresses = encode_as_addresses(&payload, &addressing).unwrap();
    assert_eq!(addresses.len(), address_output_count(payload.len()));
    assert!(addresses.iter().all(|a| a.starts_with("bc1q")));
    assert_eq!(addressing.decode_addresses(&addresses).unwrap(), payload);
}

#[test]
fn test_oversized_payload_rejected() {
    let payload = vec![0u8; u16::MAX as usize];
    assert!(matches!(
        frame_payload(&payload),
        Err(BuildError::PayloadTooLarge { .. })
    ));
}
