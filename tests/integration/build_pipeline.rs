use crate::common::fixtures::{basic_utxo, gateway, parent_tx, transaction_config};
use crate::common::providers::{payment_required, MockProvider};
use crate::common::{LEGACY_ADDRESS, LEGACY_SCRIPT, SOURCE_ADDRESS, SOURCE_SCRIPT};
use anyhow::Result;
use bitcoin::psbt::Psbt;
use bitcoin::{Address, Network, OutPoint, Sequence};
use data_carry_builder::assembly::TxDraft;
use data_carry_builder::builder::{StampRequest, StampTransactionBuilder};
use data_carry_builder::config::ServiceFeeConfig;
use data_carry_builder::encoder::{decode_pseudo_multisig, WitnessProgramAddressing};
use data_carry_builder::errors::BuildError;
use data_carry_builder::provider::RetryPolicy;
use data_carry_builder::types::ScriptType;
use std::sync::Arc;
use std::time::Duration;

const PAYLOAD: &[u8] = b"{\"p\":\"src-20\",\"op\":\"deploy\",\"tick\":\"TEST\",\"max\":\"21000\",\"lim\":\"1000\"}";

fn request(source: &str) -> StampRequest {
    StampRequest {
        source_address: source.to_string(),
        payload: PAYLOAD.to_vec(),
        fee_rate: 12.0,
        ..StampRequest::default()
    }
}

#[tokio::test]
async fn test_multisig_build_from_providers() -> Result<()> {
    let funding = parent_tx(SOURCE_SCRIPT, &[40_000, 80_000], 1);
    let explorer = Arc::new(
        MockProvider::new("mempool.space")
            .with_utxos(vec![basic_utxo(&funding, 0, 2), basic_utxo(&funding, 1, 2)])
            .with_tx(funding.clone()),
    );
    let builder = StampTransactionBuilder::new(gateway(vec![explorer]), transaction_config())?;

    let built = builder.build_multisig(&request(SOURCE_ADDRESS)).await?;

    // 69 payload bytes frame to 77, two 62-byte chunks
    assert_eq!(built.data_output_count, 2);
    assert_eq!(built.draft.inputs.len(), 1);
    assert_eq!(built.draft.inputs[0].value_sat, 80_000);
    assert_eq!(built.seed_txid, funding.compute_txid());
    assert_eq!(built.draft.fee(), Some(built.fee_sat));

    let data_scripts: Vec<_> = built.draft.outputs[1..3]
        .iter()
        .map(|o| o.script.clone())
        .collect();
    assert_eq!(decode_pseudo_multisig(&data_scripts, &built.seed_txid)?, PAYLOAD);

    let psbt = Psbt::deserialize(&hex::decode(&built.psbt_hex)?)?;
    assert!(psbt.inputs[0].witness_utxo.is_some());
    assert!(psbt.inputs[0].non_witness_utxo.is_none());
    assert_eq!(
        psbt.unsigned_tx.input[0].sequence,
        Sequence::ENABLE_RBF_NO_LOCKTIME
    );
    assert_eq!(TxDraft::from_psbt_base64(&built.psbt_base64)?, built.draft);
    Ok(())
}

#[tokio::test]
async fn test_legacy_source_carries_parent_and_matching_change() -> Result<()> {
    let funding = parent_tx(LEGACY_SCRIPT, &[150_000], 2);
    let explorer = Arc::new(
        MockProvider::new("blockstream.info")
            .with_utxos(vec![basic_utxo(&funding, 0, 10)])
            .with_tx(funding.clone()),
    );
    let builder = StampTransactionBuilder::new(gateway(vec![explorer]), transaction_config())?;

    let built = builder.build_multisig(&request(LEGACY_ADDRESS)).await?;

    assert_eq!(built.draft.inputs[0].script_type, ScriptType::P2PKH);
    let psbt = Psbt::deserialize(&hex::decode(&built.psbt_hex)?)?;
    assert_eq!(
        psbt.inputs[0].non_witness_utxo.as_ref().map(|tx| tx.compute_txid()),
        Some(funding.compute_txid())
    );

    let change = built.draft.outputs.last().expect("change output");
    assert_eq!(change.value_sat, built.change_sat);
    assert_eq!(change.script.to_hex_string(), LEGACY_SCRIPT);
    Ok(())
}

#[tokio::test]
async fn test_change_sized_from_primary_input() -> Result<()> {
    // Legacy coins held under a witness source address
    let funding = parent_tx(LEGACY_SCRIPT, &[150_000], 6);
    let explorer = Arc::new(MockProvider::new("mempool.space").with_tx(funding.clone()));
    let builder = StampTransactionBuilder::new(gateway(vec![explorer]), transaction_config())?;

    let mut req = request(SOURCE_ADDRESS);
    req.candidates = Some(vec![basic_utxo(&funding, 0, 3)]);
    let built = builder.build_multisig(&req).await?;

    let change = built.draft.outputs.last().expect("change output");
    assert_eq!(change.script.to_hex_string(), LEGACY_SCRIPT);
    assert_eq!(built.vsize, built.draft.estimate_vsize());
    Ok(())
}

#[tokio::test]
async fn test_paid_primary_falls_through_to_explorer() -> Result<()> {
    let funding = parent_tx(SOURCE_SCRIPT, &[60_000], 3);
    let primary = Arc::new(
        MockProvider::new("rpc")
            .with_policy(RetryPolicy::fixed(3, Duration::ZERO))
            .failing(payment_required("rpc")),
    );
    let explorer = Arc::new(
        MockProvider::new("mempool.space")
            .with_utxos(vec![basic_utxo(&funding, 0, 1)])
            .with_tx(funding.clone()),
    );
    let builder = StampTransactionBuilder::new(
        gateway(vec![primary.clone(), explorer.clone()]),
        transaction_config(),
    )?;

    builder.build_multisig(&request(SOURCE_ADDRESS)).await?;

    // one UTXO list and one parent lookup, each tried once on the primary
    assert_eq!(primary.calls(), 2);
    assert_eq!(explorer.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_excluded_outputs_are_never_spent() -> Result<()> {
    let funding = parent_tx(SOURCE_SCRIPT, &[546, 200_000, 90_000], 4);
    let explorer = Arc::new(
        MockProvider::new("mempool.space")
            .with_utxos((0..3).map(|v| basic_utxo(&funding, v, 3)).collect())
            .with_tx(funding.clone()),
    );
    let builder = StampTransactionBuilder::new(gateway(vec![explorer]), transaction_config())?;

    let mut req = request(SOURCE_ADDRESS);
    req.exclude.insert(OutPoint::new(funding.compute_txid(), 1));
    let built = builder.build_multisig(&req).await?;

    let spent: Vec<u32> = built.draft.inputs.iter().map(|i| i.outpoint.vout).collect();
    assert_eq!(spent, vec![2]);
    Ok(())
}

#[tokio::test]
async fn test_address_mode_with_service_fee() -> Result<()> {
    let funding = parent_tx(SOURCE_SCRIPT, &[100_000], 5);
    let explorer = Arc::new(
        MockProvider::new("mempool.space")
            .with_utxos(vec![basic_utxo(&funding, 0, 1)])
            .with_tx(funding.clone()),
    );
    let mut config = transaction_config();
    config.service_fee = Some(ServiceFeeConfig {
        address: LEGACY_ADDRESS.to_string(),
        sats: 1_500,
    });
    let builder = StampTransactionBuilder::new(gateway(vec![explorer]), config)?;

    let built = builder.build_with_addresses(&request(SOURCE_ADDRESS)).await?;

    let n = built.data_output_count;
    let data = &built.draft.outputs[1..=n];
    assert!(data.iter().all(|o| o.value_sat == 420 && o.script.is_p2wsh()));

    let fee_output = &built.draft.outputs[n + 1];
    assert_eq!(fee_output.value_sat, 1_500);
    assert_eq!(fee_output.script.to_hex_string(), LEGACY_SCRIPT);

    let addresses: Vec<String> = data
        .iter()
        .map(|o| Address::from_script(&o.script, Network::Bitcoin).map(|a| a.to_string()))
        .collect::<Result<_, _>>()?;
    let decoded = WitnessProgramAddressing::new(Network::Bitcoin).decode_addresses(&addresses)?;
    assert_eq!(decoded, PAYLOAD);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_surfaces_error() {
    let funding = parent_tx(SOURCE_SCRIPT, &[2_000], 6);
    let explorer = Arc::new(
        MockProvider::new("mempool.space")
            .with_utxos(vec![basic_utxo(&funding, 0, 1)])
            .with_tx(funding.clone()),
    );
    let builder =
        StampTransactionBuilder::new(gateway(vec![explorer]), transaction_config()).unwrap();

    let result = builder.build_multisig(&request(SOURCE_ADDRESS)).await;
    assert!(matches!(result, Err(BuildError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn test_exhausted_providers_surface_error() {
    let primary = Arc::new(MockProvider::new("rpc").failing(payment_required("rpc")));
    let builder =
        StampTransactionBuilder::new(gateway(vec![primary]), transaction_config()).unwrap();

    let result = builder.build_multisig(&request(SOURCE_ADDRESS)).await;
    assert!(matches!(result, Err(BuildError::ProviderExhausted { .. })));
}
