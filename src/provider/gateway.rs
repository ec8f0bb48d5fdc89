use super::cache::{rawtx_key, utxo_key, utxos_key};
use super::retry::{retry_provider_call, with_deadline};
use super::{Cache, CacheStats, DataProvider, ExplorerProvider, MemoryCache, RpcProvider, UtxoQuery};
use crate::assembly::ParentTransactions;
use crate::config::ProvidersConfig;
use crate::errors::{AppError, AppResult, BuildError, BuildResult, ProviderError, ProviderResult};
use crate::script::classify_script;
use crate::types::Utxo;
use bitcoin::{consensus, Transaction, Txid};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub utxo_cache_ttl: Duration,
    /// Bound on parallel parent fetches
    pub concurrent_requests: usize,
    /// Deadline for a whole enrichment or parent fan-out
    pub fetch_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&ProvidersConfig::default())
    }
}

impl From<&ProvidersConfig> for GatewaySettings {
    fn from(config: &ProvidersConfig) -> Self {
        Self {
            utxo_cache_ttl: config.utxo_cache_ttl(),
            concurrent_requests: config.concurrent_requests.max(1),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Ordered provider chain with per-provider retry, fallback and caching
///
/// The `try_*` methods report an exhausted chain as
/// `BuildError::ProviderExhausted`; `get_*` absorb it into an empty result.
/// A `NotFound` answer is not a failure: the chain still moves on, and if no
/// provider has the object the result is `None`.
pub struct DataProviderGateway {
    providers: Vec<Arc<dyn DataProvider>>,
    cache: Arc<dyn Cache>,
    settings: GatewaySettings,
}

impl DataProviderGateway {
    pub fn new(
        providers: Vec<Arc<dyn DataProvider>>,
        cache: Arc<dyn Cache>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            providers,
            cache,
            settings,
        }
    }

    /// Primary RPC first (when configured), then explorers in configured order
    pub fn from_config(config: &ProvidersConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        let mut providers: Vec<Arc<dyn DataProvider>> = Vec::new();
        if let Some(primary) = &config.primary {
            providers.push(Arc::new(RpcProvider::from_config(primary, client.clone())));
        }
        for base_url in &config.explorers {
            providers.push(Arc::new(ExplorerProvider::new(base_url, client.clone())));
        }
        if providers.is_empty() {
            return Err(AppError::Config("no data providers configured".to_string()));
        }

        Ok(Self::new(
            providers,
            Arc::new(MemoryCache::new()),
            GatewaySettings::from(config),
        ))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn run_chain<T, F, Fut>(&self, operation: &str, call: F) -> BuildResult<Option<T>>
    where
        F: Fn(Arc<dyn DataProvider>) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut not_found = false;

        for provider in &self.providers {
            let policy = provider.retry_policy();
            let result = retry_provider_call(&policy, provider.name(), operation, || {
                call(Arc::clone(provider))
            })
            .await;

            match result {
                Ok(value) => {
                    debug!("{} served {}", provider.name(), operation);
                    return Ok(Some(value));
                }
                Err(ProviderError::NotFound { .. }) => {
                    debug!("{} has no result for {}", provider.name(), operation);
                    not_found = true;
                }
                Err(err) => {
                    warn!("{} failed for {}: {}. Falling back", provider.name(), operation, err);
                }
            }
        }

        if not_found {
            Ok(None)
        } else {
            Err(BuildError::ProviderExhausted {
                operation: operation.to_string(),
            })
        }
    }

    fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn store<T: serde::Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.put(key, raw, ttl),
            Err(e) => warn!("Not caching {}: {}", key, e),
        }
    }

    /// Address UTXOs filtered by `query`; the unfiltered list is cached
    pub async fn try_get_utxos(&self, address: &str, query: &UtxoQuery) -> BuildResult<Vec<Utxo>> {
        let key = utxos_key(address);
        let utxos: Vec<Utxo> = match self.cached(&key) {
            Some(utxos) => utxos,
            None => {
                let owned = address.to_string();
                let fetched = self
                    .run_chain("get_utxos", |provider| {
                        let address = owned.clone();
                        async move { provider.fetch_utxos(&address).await }
                    })
                    .await?
                    .unwrap_or_default();
                self.store(&key, &fetched, Some(self.settings.utxo_cache_ttl));
                fetched
            }
        };

        let total = utxos.len();
        let admitted: Vec<Utxo> = utxos.into_iter().filter(|u| query.admits(u)).collect();
        info!("{} UTXOs for {} ({} after filtering)", total, address, admitted.len());
        Ok(admitted)
    }

    pub async fn try_get_utxo(
        &self,
        txid: &Txid,
        vout: u32,
        include_ancestors: bool,
    ) -> BuildResult<Option<Utxo>> {
        let key = utxo_key(txid, vout, include_ancestors);
        if let Some(utxo) = self.cached(&key) {
            return Ok(Some(utxo));
        }

        let txid = *txid;
        let found = self
            .run_chain("get_utxo", |provider| async move {
                provider.fetch_utxo(&txid, vout, include_ancestors).await
            })
            .await?;
        if let Some(utxo) = &found {
            self.store(&key, utxo, Some(self.settings.utxo_cache_ttl));
        }
        Ok(found)
    }

    /// Raw transactions are cached for the gateway's lifetime
    pub async fn try_get_raw_tx(&self, txid: &Txid) -> BuildResult<Option<Vec<u8>>> {
        let key = rawtx_key(txid);
        if let Some(raw_hex) = self.cache.get(&key) {
            if let Ok(raw) = hex::decode(&raw_hex) {
                return Ok(Some(raw));
            }
        }

        let txid = *txid;
        let found = self
            .run_chain("get_raw_tx", |provider| async move {
                provider.fetch_raw_tx(&txid).await
            })
            .await?;
        if let Some(raw) = &found {
            self.cache.put(&key, hex::encode(raw), None);
        }
        Ok(found)
    }

    pub async fn get_utxos(&self, address: &str, query: &UtxoQuery) -> Vec<Utxo> {
        self.try_get_utxos(address, query)
            .await
            .unwrap_or_else(|e| {
                warn!("get_utxos({}) returned nothing: {}", address, e);
                Vec::new()
            })
    }

    pub async fn get_utxo(&self, txid: &Txid, vout: u32, include_ancestors: bool) -> Option<Utxo> {
        self.try_get_utxo(txid, vout, include_ancestors)
            .await
            .unwrap_or_else(|e| {
                warn!("get_utxo({}:{}) returned nothing: {}", txid, vout, e);
                None
            })
    }

    pub async fn get_raw_tx(&self, txid: &Txid) -> Option<Vec<u8>> {
        self.try_get_raw_tx(txid).await.unwrap_or_else(|e| {
            warn!("get_raw_tx({}) returned nothing: {}", txid, e);
            None
        })
    }

    /// Fetch and decode one parent transaction
    pub async fn parent_transaction(&self, txid: &Txid) -> BuildResult<Transaction> {
        let raw = self
            .try_get_raw_tx(txid)
            .await?
            .ok_or_else(|| BuildError::MissingPreviousTransaction {
                txid: txid.to_string(),
            })?;
        consensus::deserialize(&raw).map_err(|e| {
            warn!("Parent {} does not decode: {}", txid, e);
            BuildError::MissingPreviousTransaction {
                txid: txid.to_string(),
            }
        })
    }

    /// Fill in scripts (and ancestor facts when asked) for basic UTXOs
    ///
    /// Each parent is fetched once however many outputs it funds. The fan-out
    /// is all-or-nothing and bounded by `concurrent_requests`.
    pub async fn enrich_utxos(&self, utxos: Vec<Utxo>, query: &UtxoQuery) -> BuildResult<Vec<Utxo>> {
        let admitted: Vec<Utxo> = utxos.into_iter().filter(|u| query.admits(u)).collect();

        // txid -> vout to ask about ancestors, if any
        let mut wanted: HashMap<Txid, Option<u32>> = HashMap::new();
        for utxo in &admitted {
            let wants_ancestor =
                query.include_ancestors && !utxo.is_confirmed() && utxo.ancestor.is_none();
            if !utxo.has_script() || wants_ancestor {
                let entry = wanted.entry(utxo.txid).or_insert(None);
                if wants_ancestor && entry.is_none() {
                    *entry = Some(utxo.vout);
                }
            }
        }
        if wanted.is_empty() {
            return Ok(admitted);
        }
        debug!("Enriching {} UTXOs from {} parents", admitted.len(), wanted.len());

        let fetches = stream::iter(wanted)
            .map(|(txid, ancestor_vout)| async move {
                let parent = self.parent_transaction(&txid).await?;
                let ancestor = match ancestor_vout {
                    Some(vout) => self
                        .try_get_utxo(&txid, vout, true)
                        .await?
                        .and_then(|u| u.ancestor),
                    None => None,
                };
                Ok::<_, BuildError>((txid, (parent, ancestor)))
            })
            .buffer_unordered(self.settings.concurrent_requests.max(1))
            .try_collect::<HashMap<_, _>>();

        let parents = with_deadline(self.settings.fetch_timeout, "enrich_utxos", fetches).await?;

        admitted
            .into_iter()
            .map(|mut utxo| {
                let Some((parent, ancestor)) = parents.get(&utxo.txid) else {
                    return Ok(utxo);
                };
                let output = parent.output.get(utxo.vout as usize).ok_or_else(|| {
                    BuildError::InvalidUtxoReference(format!("{}:{}", utxo.txid, utxo.vout))
                })?;
                utxo.value = output.value.to_sat();
                utxo.script = output.script_pubkey.clone();
                utxo.script_type = classify_script(&utxo.script).script_type;
                if utxo.ancestor.is_none() && !utxo.is_confirmed() {
                    utxo.ancestor = ancestor.clone();
                }
                Ok(utxo)
            })
            .collect()
    }

    /// Parent transactions for legacy inputs, which PSBTs carry in full
    pub async fn fetch_parent_transactions(&self, inputs: &[Utxo]) -> BuildResult<ParentTransactions> {
        let mut txids: Vec<Txid> = inputs
            .iter()
            .filter(|u| !u.script_type.is_witness())
            .map(|u| u.txid)
            .collect();
        txids.sort();
        txids.dedup();
        if txids.is_empty() {
            return Ok(ParentTransactions::new());
        }

        let fetches = stream::iter(txids)
            .map(|txid| async move { Ok::<_, BuildError>((txid, self.parent_transaction(&txid).await?)) })
            .buffer_unordered(self.settings.concurrent_requests.max(1))
            .try_collect::<ParentTransactions>();

        with_deadline(self.settings.fetch_timeout, "fetch_parent_transactions", fetches).await
    }
}
