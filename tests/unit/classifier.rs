use crate::common::fixtures::{enriched_utxo, parent_tx};
use crate::common::TESTNET_ADDRESS;
use bitcoin::Network;
use data_carry_builder::assembly::{PrevoutData, TransactionAssembler};
use data_carry_builder::errors::BuildError;
use data_carry_builder::script::{classify_address, classify_script, require_address};
use data_carry_builder::types::ScriptType;
use std::collections::HashMap;

const MAINNET: [(&str, ScriptType); 5] = [
    ("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH", ScriptType::P2PKH),
    ("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", ScriptType::P2SH),
    ("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", ScriptType::P2WPKH),
    (
        "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3",
        ScriptType::P2WSH,
    ),
    (
        "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0",
        ScriptType::P2TR,
    ),
];

#[test]
fn test_address_and_script_classification_agree() {
    for (address, expected) in MAINNET {
        let by_address = classify_address(address, Network::Bitcoin);
        let script = require_address(address, Network::Bitcoin).unwrap().script_pubkey();
        let by_script = classify_script(&script);

        assert_eq!(by_address.script_type, expected, "{}", address);
        assert_eq!(by_address, by_script, "{}", address);
    }
}

#[test]
fn test_garbage_classifies_as_unknown() {
    for input in ["", "not an address", "bc1qqqqq", "0000"] {
        assert_eq!(
            classify_address(input, Network::Bitcoin).script_type,
            ScriptType::Unknown
        );
    }
    assert_eq!(
        classify_address(TESTNET_ADDRESS, Network::Bitcoin).script_type,
        ScriptType::Unknown
    );
    assert!(matches!(
        require_address(TESTNET_ADDRESS, Network::Bitcoin),
        Err(BuildError::NetworkMismatch { .. })
    ));
    assert_eq!(
        classify_address(TESTNET_ADDRESS, Network::Testnet).script_type,
        ScriptType::P2WPKH
    );
}

#[test]
fn test_prevout_data_follows_kind() {
    let assembler = TransactionAssembler::new(Network::Bitcoin, true);

    for (index, (address, kind)) in MAINNET.iter().enumerate() {
        let script = require_address(address, Network::Bitcoin).unwrap().script_pubkey();
        let parent = parent_tx(&script.to_hex_string(), &[25_000], index as u8);
        let utxo = enriched_utxo(&parent, 0, 1);

        let parents = HashMap::from([(parent.compute_txid(), parent.clone())]);
        let spec = assembler.input_spec(&utxo, &parents, None, None).unwrap();
        assert_eq!(spec.script_type, *kind);
        match spec.prevout {
            PrevoutData::Witness(txout) => {
                assert!(kind.is_witness(), "{}", address);
                assert_eq!(txout.value.to_sat(), 25_000);
            }
            PrevoutData::Legacy(tx) => {
                assert!(!kind.is_witness(), "{}", address);
                assert_eq!(tx.compute_txid(), utxo.txid);
            }
        }

        if !kind.is_witness() {
            let missing = assembler.input_spec(&utxo, &HashMap::new(), None, None);
            assert!(matches!(
                missing,
                Err(BuildError::MissingPreviousTransaction { .. })
            ));
        }
    }
}
