use data_carry_builder::config::TransactionConfig;
use data_carry_builder::provider::{DataProvider, DataProviderGateway, GatewaySettings, MemoryCache};
use data_carry_builder::script::classify_script;
use data_carry_builder::types::{ScriptType, Utxo};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::sync::Arc;

pub fn script(hex_str: &str) -> ScriptBuf {
    ScriptBuf::from_hex(hex_str).unwrap()
}

/// A parent whose outputs all pay `script_hex`; `salt` keeps txids distinct
pub fn parent_tx(script_hex: &str, values: &[u64], salt: u8) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([salt; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: values
            .iter()
            .map(|v| TxOut {
                value: Amount::from_sat(*v),
                script_pubkey: script(script_hex),
            })
            .collect(),
    }
}

/// What an explorer reports before enrichment: no script, unknown kind
pub fn basic_utxo(tx: &Transaction, vout: u32, confirmations: u32) -> Utxo {
    Utxo {
        txid: tx.compute_txid(),
        vout,
        value: tx.output[vout as usize].value.to_sat(),
        script: ScriptBuf::new(),
        script_type: ScriptType::Unknown,
        confirmations,
        ancestor: None,
    }
}

pub fn enriched_utxo(tx: &Transaction, vout: u32, confirmations: u32) -> Utxo {
    let output = &tx.output[vout as usize];
    Utxo {
        script: output.script_pubkey.clone(),
        script_type: classify_script(&output.script_pubkey).script_type,
        ..basic_utxo(tx, vout, confirmations)
    }
}

pub fn gateway(providers: Vec<Arc<dyn DataProvider>>) -> Arc<DataProviderGateway> {
    gateway_with(providers, GatewaySettings::default())
}

pub fn gateway_with(
    providers: Vec<Arc<dyn DataProvider>>,
    settings: GatewaySettings,
) -> Arc<DataProviderGateway> {
    Arc::new(DataProviderGateway::new(
        providers,
        Arc::new(MemoryCache::new()),
        settings,
    ))
}

pub fn transaction_config() -> TransactionConfig {
    TransactionConfig::default()
}
