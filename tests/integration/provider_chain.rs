use crate::common::fixtures::{basic_utxo, enriched_utxo, gateway, gateway_with, parent_tx};
use crate::common::providers::{service_unavailable, MockProvider};
use crate::common::{LEGACY_SCRIPT, SOURCE_ADDRESS, SOURCE_SCRIPT};
use anyhow::Result;
use bitcoin::hashes::Hash;
use bitcoin::Txid;
use data_carry_builder::errors::BuildError;
use data_carry_builder::provider::{DataProvider, GatewaySettings, RetryPolicy, UtxoQuery};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_transient_failures_are_retried_then_skipped() -> Result<()> {
    let parent = parent_tx(SOURCE_SCRIPT, &[25_000], 30);
    let flaky = Arc::new(
        MockProvider::new("flaky")
            .with_policy(RetryPolicy::fixed(3, Duration::from_millis(5)))
            .failing(service_unavailable("flaky")),
    );
    let backup = Arc::new(MockProvider::new("backup").with_utxos(vec![basic_utxo(&parent, 0, 3)]));
    let gateway = gateway(vec![
        flaky.clone() as Arc<dyn DataProvider>,
        backup.clone() as Arc<dyn DataProvider>,
    ]);

    let utxos = gateway.try_get_utxos(SOURCE_ADDRESS, &UtxoQuery::default()).await?;
    assert_eq!(utxos.len(), 1);
    assert_eq!(flaky.calls(), 3);
    assert_eq!(backup.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_utxo_list_expires_from_cache() -> Result<()> {
    let parent = parent_tx(SOURCE_SCRIPT, &[25_000], 31);
    let provider = Arc::new(MockProvider::new("explorer").with_utxos(vec![basic_utxo(&parent, 0, 3)]));
    let settings = GatewaySettings {
        utxo_cache_ttl: Duration::from_millis(50),
        ..GatewaySettings::default()
    };
    let gateway = gateway_with(vec![provider.clone() as Arc<dyn DataProvider>], settings);
    let query = UtxoQuery::default();

    gateway.try_get_utxos(SOURCE_ADDRESS, &query).await?;
    gateway.try_get_utxos(SOURCE_ADDRESS, &query).await?;
    assert_eq!(provider.calls(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    gateway.try_get_utxos(SOURCE_ADDRESS, &query).await?;
    assert_eq!(provider.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_slow_enrichment_hits_deadline() {
    let parent = parent_tx(SOURCE_SCRIPT, &[25_000], 32);
    let slow = Arc::new(
        MockProvider::new("slow")
            .with_delay(Duration::from_millis(500))
            .with_tx(parent.clone()),
    );
    let settings = GatewaySettings {
        fetch_timeout: Duration::from_millis(50),
        ..GatewaySettings::default()
    };
    let gateway = gateway_with(vec![slow as Arc<dyn DataProvider>], settings);

    let result = gateway
        .enrich_utxos(vec![basic_utxo(&parent, 0, 3)], &UtxoQuery::default())
        .await;
    assert!(matches!(
        result,
        Err(BuildError::Timeout { ref operation, .. }) if operation == "enrich_utxos"
    ));
}

#[tokio::test]
async fn test_not_found_everywhere_is_absent() -> Result<()> {
    let first = Arc::new(MockProvider::new("first"));
    let second = Arc::new(MockProvider::new("second"));
    let gateway = gateway(vec![
        first.clone() as Arc<dyn DataProvider>,
        second.clone() as Arc<dyn DataProvider>,
    ]);
    let unknown = Txid::from_byte_array([7; 32]);

    assert_eq!(gateway.try_get_raw_tx(&unknown).await?, None);
    assert_eq!(gateway.try_get_utxo(&unknown, 0, false).await?, None);
    assert_eq!(first.calls(), 2);
    assert_eq!(second.calls(), 2);

    let missing = gateway.parent_transaction(&unknown).await;
    assert!(matches!(
        missing,
        Err(BuildError::MissingPreviousTransaction { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_lenient_getters_absorb_exhaustion() {
    let down = Arc::new(MockProvider::new("down").failing(service_unavailable("down")));
    let gateway = gateway(vec![down as Arc<dyn DataProvider>]);
    let txid = Txid::from_byte_array([8; 32]);

    assert!(gateway.get_utxos(SOURCE_ADDRESS, &UtxoQuery::default()).await.is_empty());
    assert_eq!(gateway.get_utxo(&txid, 1, false).await, None);
    assert_eq!(gateway.get_raw_tx(&txid).await, None);
    assert!(matches!(
        gateway.try_get_raw_tx(&txid).await,
        Err(BuildError::ProviderExhausted { .. })
    ));
}

#[tokio::test]
async fn test_enrichment_leaves_complete_utxos_alone() -> Result<()> {
    let parent = parent_tx(LEGACY_SCRIPT, &[12_000], 33);
    let provider = Arc::new(MockProvider::new("explorer"));
    let gateway = gateway(vec![provider.clone() as Arc<dyn DataProvider>]);

    let ready = enriched_utxo(&parent, 0, 6);
    let enriched = gateway
        .enrich_utxos(vec![ready.clone()], &UtxoQuery::default())
        .await?;
    assert_eq!(enriched, vec![ready]);
    assert_eq!(provider.calls(), 0);
    Ok(())
}
