//! Multi-provider data access
//!
//! - `DataProvider`: one backend (JSON-RPC primary or Esplora explorer)
//! - `DataProviderGateway`: ordered provider chain with retry, fallback and caching
//! - `cache`: the get/put cache contract and an in-memory implementation
//! - `retry`: retry policy, backoff and deadline helpers

pub mod cache;
pub mod explorer;
pub mod gateway;
pub mod retry;
pub mod rpc;

use crate::errors::{ProviderError, ProviderResult};
use crate::types::Utxo;
use async_trait::async_trait;
use bitcoin::{OutPoint, Txid};
use std::collections::HashSet;

pub use cache::{Cache, CacheStats, MemoryCache};
pub use explorer::ExplorerProvider;
pub use gateway::{DataProviderGateway, GatewaySettings};
pub use retry::RetryPolicy;
pub use rpc::RpcProvider;

/// Options for UTXO lookups
#[derive(Debug, Clone, Default)]
pub struct UtxoQuery {
    pub confirmed_only: bool,
    pub include_ancestors: bool,
    /// Outpoints never to return, e.g. outputs carrying an asset
    pub exclude: HashSet<OutPoint>,
}

impl UtxoQuery {
    pub fn admits(&self, utxo: &Utxo) -> bool {
        (!self.confirmed_only || utxo.is_confirmed()) && !self.exclude.contains(&utxo.outpoint())
    }
}

/// One backend in the provider chain
#[async_trait]
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn retry_policy(&self) -> RetryPolicy;

    /// Unspent outputs of an address; scripts may be left empty
    async fn fetch_utxos(&self, address: &str) -> ProviderResult<Vec<Utxo>>;

    async fn fetch_utxo(&self, txid: &Txid, vout: u32, include_ancestors: bool)
        -> ProviderResult<Utxo>;

    /// Consensus-serialised transaction bytes
    async fn fetch_raw_tx(&self, txid: &Txid) -> ProviderResult<Vec<u8>>;
}

/// Map a non-success HTTP status onto the provider error taxonomy
///
/// 402 and every other 4xx are fatal for the provider. A 404 is reported as
/// `NotFound` only when `missing` names the object being looked up.
pub fn status_error(
    provider: &str,
    status: reqwest::StatusCode,
    missing: Option<&str>,
) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(what) = missing {
            return Some(ProviderError::NotFound {
                provider: provider.to_string(),
                what: what.to_string(),
            });
        }
    }
    if status.is_client_error() {
        return Some(ProviderError::Fatal {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    Some(ProviderError::Transient {
        provider: provider.to_string(),
        message: format!("HTTP {}", status),
    })
}

/// Request-level failures (connect, timeout, body) are transient
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::Transient {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn invalid_response(provider: &str, message: impl Into<String>) -> ProviderError {
    ProviderError::InvalidResponse {
        provider: provider.to_string(),
        message: message.into(),
    }
}
