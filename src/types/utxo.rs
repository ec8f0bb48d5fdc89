use crate::errors::{BuildError, BuildResult};
use crate::types::ScriptType;
use bitcoin::{OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Spendable output as normalised from any provider
///
/// Providers that only return `txid`/`vout`/`value` leave `script` empty and
/// `script_type` unknown; the gateway's enrichment pass fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis
    pub value: u64,
    pub script: ScriptBuf,
    pub script_type: ScriptType,
    pub confirmations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<AncestorInfo>,
}

impl Utxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }

    pub fn has_script(&self) -> bool {
        !self.script.is_empty()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmations > 0
    }
}

/// Fee facts about an unconfirmed parent, used for ancestor-aware fee accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorInfo {
    pub fees_sat: u64,
    pub vsize_bytes: u32,
    pub effective_rate_sat_per_vb: f64,
}

impl AncestorInfo {
    pub fn new(fees_sat: u64, vsize_bytes: u32) -> Self {
        let effective_rate_sat_per_vb = if vsize_bytes == 0 {
            0.0
        } else {
            fees_sat as f64 / vsize_bytes as f64
        };
        Self {
            fees_sat,
            vsize_bytes,
            effective_rate_sat_per_vb,
        }
    }
}

/// Output a caller wants in the transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRequest {
    ToAddress { address: String, value_sat: u64 },
    ToScript { script: ScriptBuf, value_sat: u64 },
}

impl OutputRequest {
    pub fn value_sat(&self) -> u64 {
        match self {
            OutputRequest::ToAddress { value_sat, .. } | OutputRequest::ToScript { value_sat, .. } => {
                *value_sat
            }
        }
    }

    /// Same destination, different value
    pub fn with_value(&self, value_sat: u64) -> Self {
        match self {
            OutputRequest::ToAddress { address, .. } => OutputRequest::ToAddress {
                address: address.clone(),
                value_sat,
            },
            OutputRequest::ToScript { script, .. } => OutputRequest::ToScript {
                script: script.clone(),
                value_sat,
            },
        }
    }
}

/// Parse a `txid:vout` reference
pub fn parse_utxo_ref(reference: &str) -> BuildResult<OutPoint> {
    let (txid_part, vout_part) = reference.trim().rsplit_once(':').ok_or_else(|| {
        BuildError::InvalidUtxoReference(format!("expected txid:vout, got '{}'", reference))
    })?;

    let txid = Txid::from_str(txid_part).map_err(|e| {
        BuildError::InvalidUtxoReference(format!("invalid txid '{}': {}", txid_part, e))
    })?;

    if vout_part.starts_with('-') {
        return Err(BuildError::InvalidUtxoReference(format!(
            "negative vout in '{}'",
            reference
        )));
    }
    let vout = vout_part.parse::<u32>().map_err(|e| {
        BuildError::InvalidUtxoReference(format!("invalid vout '{}': {}", vout_part, e))
    })?;

    Ok(OutPoint::new(txid, vout))
}
