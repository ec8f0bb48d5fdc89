//! Esplora-compatible explorer backend (mempool.space, blockstream.info)

use super::{invalid_response, status_error, transport_error, DataProvider, RetryPolicy};
use crate::errors::ProviderResult;
use crate::script::classify_script;
use crate::types::{AncestorInfo, ScriptType, Utxo};
use async_trait::async_trait;
use bitcoin::{ScriptBuf, Txid};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    #[serde(alias = "tx_hash")]
    txid: String,
    #[serde(alias = "tx_output_n")]
    vout: u32,
    value: u64,
    #[serde(default)]
    status: TxStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraTx {
    vout: Vec<EsploraOutput>,
    #[serde(default)]
    status: TxStatus,
    #[serde(default)]
    weight: Option<u64>,
    #[serde(default)]
    fee: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EsploraOutput {
    scriptpubkey: String,
    #[serde(default)]
    scriptpubkey_type: Option<String>,
    value: u64,
}

/// Confirmation count from the chain tip; unconfirmed or unknown height is 0
fn confirmations(status: &TxStatus, tip_height: Option<u32>) -> u32 {
    match (status.confirmed, status.block_height, tip_height) {
        (true, Some(height), Some(tip)) if tip >= height => tip - height + 1,
        (true, _, _) => 1,
        _ => 0,
    }
}

pub struct ExplorerProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl ExplorerProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let name = reqwest::Url::parse(&base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| base_url.clone());
        Self {
            name,
            base_url,
            client,
        }
    }

    async fn get(&self, path: &str, missing: Option<&str>) -> ProviderResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} GET {}", self.name, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e))?;
        match status_error(&self.name, response.status(), missing) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, missing: Option<&str>) -> ProviderResult<T> {
        self.get(path, missing)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(&self.name, format!("{}: {}", path, e)))
    }

    async fn get_text(&self, path: &str, missing: Option<&str>) -> ProviderResult<String> {
        self.get(path, missing)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(&self.name, e))
    }

    async fn tip_height(&self) -> ProviderResult<u32> {
        let body = self.get_text("/blocks/tip/height", None).await?;
        body.trim()
            .parse()
            .map_err(|_| invalid_response(&self.name, format!("bad tip height {:?}", body)))
    }
}

#[async_trait]
impl DataProvider for ExplorerProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::single_attempt()
    }

    async fn fetch_utxos(&self, address: &str) -> ProviderResult<Vec<Utxo>> {
        let raw: Vec<EsploraUtxo> = self
            .get_json(&format!("/address/{}/utxo", address), None)
            .await?;

        let tip = if raw.iter().any(|u| u.status.confirmed) {
            Some(self.tip_height().await?)
        } else {
            None
        };

        raw.into_iter()
            .map(|entry| {
                let txid = Txid::from_str(&entry.txid).map_err(|e| {
                    invalid_response(&self.name, format!("bad txid {}: {}", entry.txid, e))
                })?;
                Ok(Utxo {
                    txid,
                    vout: entry.vout,
                    value: entry.value,
                    script: ScriptBuf::new(),
                    script_type: ScriptType::Unknown,
                    confirmations: confirmations(&entry.status, tip),
                    ancestor: None,
                })
            })
            .collect()
    }

    async fn fetch_utxo(
        &self,
        txid: &Txid,
        vout: u32,
        include_ancestors: bool,
    ) -> ProviderResult<Utxo> {
        let what = format!("{}:{}", txid, vout);
        let tx: EsploraTx = self.get_json(&format!("/tx/{}", txid), Some(&what)).await?;

        let output = tx.vout.get(vout as usize).ok_or_else(|| {
            crate::errors::ProviderError::NotFound {
                provider: self.name.clone(),
                what: what.clone(),
            }
        })?;

        let script = ScriptBuf::from_hex(&output.scriptpubkey)
            .map_err(|e| invalid_response(&self.name, format!("bad script hex: {}", e)))?;
        let script_type = match classify_script(&script).script_type {
            ScriptType::Unknown => output
                .scriptpubkey_type
                .as_deref()
                .and_then(|k| k.parse().ok())
                .unwrap_or(ScriptType::Unknown),
            known => known,
        };

        let tip = if tx.status.confirmed {
            Some(self.tip_height().await?)
        } else {
            None
        };

        let ancestor = match (include_ancestors, tx.status.confirmed, tx.fee, tx.weight) {
            (true, false, Some(fee), Some(weight)) => {
                Some(AncestorInfo::new(fee, weight.div_ceil(4) as u32))
            }
            _ => None,
        };

        Ok(Utxo {
            txid: *txid,
            vout,
            value: output.value,
            script,
            script_type,
            confirmations: confirmations(&tx.status, tip),
            ancestor,
        })
    }

    async fn fetch_raw_tx(&self, txid: &Txid) -> ProviderResult<Vec<u8>> {
        let what = txid.to_string();
        let body = self
            .get_text(&format!("/tx/{}/hex", txid), Some(&what))
            .await?;
        hex::decode(body.trim())
            .map_err(|e| invalid_response(&self.name, format!("raw tx is not hex: {}", e)))
    }
}
