//! Primary JSON-RPC provider (Blockbook-style endpoints)
//!
//! - `bb_getUTXOs [address, {confirmed}]` - values are satoshi strings
//! - `bb_getTxSpecific [txid]` - bitcoind-style verbose tx, values in BTC
//! - `getrawtransaction [txid, false]` - raw hex

use super::{invalid_response, status_error, transport_error, DataProvider, RetryPolicy};
use crate::config::PrimaryProviderConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::script::classify_script;
use crate::types::{AncestorInfo, ScriptType, Utxo};
use async_trait::async_trait;
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Amount, ScriptBuf, Txid};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// bitcoind "No such mempool or blockchain transaction"
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockbookUtxo {
    txid: String,
    vout: u32,
    value: Value,
    #[serde(default)]
    confirmations: u32,
}

#[derive(Debug, Deserialize)]
struct VerboseTransaction {
    vout: Vec<VerboseOutput>,
    #[serde(default)]
    confirmations: u32,
    #[serde(default)]
    vsize: Option<u32>,
    /// BTC, present on some node versions
    #[serde(default)]
    fee: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VerboseOutput {
    value: f64,
    n: u32,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: VerboseScript,
}

#[derive(Debug, Deserialize)]
struct VerboseScript {
    hex: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Satoshi amount given either as a string or a JSON integer
fn sats_from_json(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub struct RpcProvider {
    name: String,
    endpoint: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RpcProvider {
    pub fn new(name: &str, endpoint: &str, client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            client,
            policy,
        }
    }

    /// Endpoint is `{url}/{api_key}` when a key is configured
    pub fn from_config(config: &PrimaryProviderConfig, client: reqwest::Client) -> Self {
        let base = config.url.trim_end_matches('/');
        let endpoint = match config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => format!("{}/{}", base, key),
            None => base.to_string(),
        };
        Self::new(
            "rpc",
            &endpoint,
            client,
            RetryPolicy::fixed(
                config.max_retries,
                Duration::from_millis(config.retry_delay_ms),
            ),
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let body = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        debug!("{} -> {}", self.name, method);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e))?;

        if let Some(err) = status_error(&self.name, response.status(), None) {
            return Err(err);
        }

        let envelope: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| invalid_response(&self.name, format!("{}: {}", method, e)))?;

        if let Some(error) = envelope.error {
            return Err(if error.code == RPC_INVALID_ADDRESS_OR_KEY {
                ProviderError::NotFound {
                    provider: self.name.clone(),
                    what: format!("{} ({})", method, error.message),
                }
            } else {
                ProviderError::Transient {
                    provider: self.name.clone(),
                    message: format!("{} error {}: {}", method, error.code, error.message),
                }
            });
        }

        envelope
            .result
            .ok_or_else(|| invalid_response(&self.name, format!("{} returned no result", method)))
    }

    fn parse_txid(&self, txid: &str) -> ProviderResult<Txid> {
        Txid::from_str(txid).map_err(|e| invalid_response(&self.name, format!("bad txid {}: {}", txid, e)))
    }

    /// Reject outputs whose reported address disagrees with the script
    fn checked_script(&self, script: &VerboseScript) -> ProviderResult<ScriptBuf> {
        let parsed = ScriptBuf::from_hex(&script.hex)
            .map_err(|e| invalid_response(&self.name, format!("bad script hex: {}", e)))?;
        if let Some(address) = &script.address {
            if let Ok(unchecked) = Address::<NetworkUnchecked>::from_str(address) {
                if unchecked.assume_checked().script_pubkey() != parsed {
                    return Err(invalid_response(
                        &self.name,
                        format!("script does not match reported address {}", address),
                    ));
                }
            }
        }
        Ok(parsed)
    }
}

#[async_trait]
impl DataProvider for RpcProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn fetch_utxos(&self, address: &str) -> ProviderResult<Vec<Utxo>> {
        let raw: Vec<BlockbookUtxo> = self
            .call("bb_getUTXOs", json!([address, { "confirmed": false }]))
            .await?;

        raw.into_iter()
            .map(|entry| {
                let value = sats_from_json(&entry.value).ok_or_else(|| {
                    invalid_response(&self.name, format!("bad value {}", entry.value))
                })?;
                Ok(Utxo {
                    txid: self.parse_txid(&entry.txid)?,
                    vout: entry.vout,
                    value,
                    script: ScriptBuf::new(),
                    script_type: ScriptType::Unknown,
                    confirmations: entry.confirmations,
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
        let tx: VerboseTransaction = self
            .call("bb_getTxSpecific", json!([txid.to_string()]))
            .await?;

        let output = tx.vout.iter().find(|o| o.n == vout).ok_or_else(|| {
            ProviderError::NotFound {
                provider: self.name.clone(),
                what: format!("{}:{}", txid, vout),
            }
        })?;

        let value = Amount::from_btc(output.value)
            .map_err(|e| invalid_response(&self.name, format!("bad value {}: {}", output.value, e)))?
            .to_sat();
        let script = self.checked_script(&output.script_pub_key)?;
        let script_type = match classify_script(&script).script_type {
            ScriptType::Unknown => output
                .script_pub_key
                .kind
                .as_deref()
                .and_then(|k| k.parse().ok())
                .unwrap_or(ScriptType::Unknown),
            known => known,
        };

        let ancestor = match (include_ancestors, tx.confirmations, tx.fee, tx.vsize) {
            (true, 0, Some(fee_btc), Some(vsize)) => Amount::from_btc(fee_btc)
                .ok()
                .map(|fee| AncestorInfo::new(fee.to_sat(), vsize)),
            _ => None,
        };

        Ok(Utxo {
            txid: *txid,
            vout,
            value,
            script,
            script_type,
            confirmations: tx.confirmations,
            ancestor,
        })
    }

    async fn fetch_raw_tx(&self, txid: &Txid) -> ProviderResult<Vec<u8>> {
        let raw_hex: String = self
            .call("getrawtransaction", json!([txid.to_string(), false]))
            .await?;
        hex::decode(raw_hex.trim())
            .map_err(|e| invalid_response(&self.name, format!("raw tx is not hex: {}", e)))
    }
}
