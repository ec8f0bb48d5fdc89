use data_carry_builder::errors::{ProviderError, ProviderResult};
use data_carry_builder::provider::{DataProvider, RetryPolicy};
use data_carry_builder::types::Utxo;
use async_trait::async_trait;
use bitcoin::{consensus, Transaction, Txid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-process backend with scripted answers and a call counter
pub struct MockProvider {
    name: String,
    policy: RetryPolicy,
    failure: Option<ProviderError>,
    delay: Duration,
    utxos: Vec<Utxo>,
    transactions: HashMap<Txid, Transaction>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            policy: RetryPolicy::single_attempt(),
            failure: None,
            delay: Duration::ZERO,
            utxos: Vec::new(),
            transactions: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Every call fails with `failure`
    pub fn failing(mut self, failure: ProviderError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_utxos(mut self, utxos: Vec<Utxo>) -> Self {
        self.utxos = utxos;
        self
    }

    pub fn with_tx(mut self, tx: Transaction) -> Self {
        self.transactions.insert(tx.compute_txid(), tx);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn not_found(&self, what: String) -> ProviderError {
        ProviderError::NotFound {
            provider: self.name.clone(),
            what,
        }
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn fetch_utxos(&self, _address: &str) -> ProviderResult<Vec<Utxo>> {
        self.begin().await?;
        Ok(self.utxos.clone())
    }

    async fn fetch_utxo(&self, txid: &Txid, vout: u32, _include_ancestors: bool) -> ProviderResult<Utxo> {
        self.begin().await?;
        self.utxos
            .iter()
            .find(|u| u.txid == *txid && u.vout == vout)
            .cloned()
            .ok_or_else(|| self.not_found(format!("{}:{}", txid, vout)))
    }

    async fn fetch_raw_tx(&self, txid: &Txid) -> ProviderResult<Vec<u8>> {
        self.begin().await?;
        self.transactions
            .get(txid)
            .map(consensus::serialize)
            .ok_or_else(|| self.not_found(txid.to_string()))
    }
}

pub fn payment_required(provider: &str) -> ProviderError {
    ProviderError::Fatal {
        provider: provider.to_string(),
        status: 402,
    }
}

pub fn service_unavailable(provider: &str) -> ProviderError {
    ProviderError::Transient {
        provider: provider.to_string(),
        message: "HTTP 503".to_string(),
    }
}
