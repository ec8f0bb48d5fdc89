use super::print_json;
use crate::encoder::payload::inflate_if_compressed;
use crate::encoder::{decode_pseudo_multisig, WitnessProgramAddressing};
use crate::errors::{AppError, AppResult};
use bitcoin::{Network, ScriptBuf, Txid};
use clap::Args;
use serde::Serialize;
use std::str::FromStr;

/// Recover a payload from pseudo-multisig scripts or data addresses
#[derive(Args)]
pub struct DecodeCommand {
    /// Pseudo-multisig script hex, in output order (repeatable)
    #[arg(long = "script", conflicts_with = "addresses")]
    pub scripts: Vec<String>,

    /// Data address, in output order (repeatable)
    #[arg(long = "address")]
    pub addresses: Vec<String>,

    /// Keystream seed; required with --script
    #[arg(long)]
    pub seed_txid: Option<String>,

    #[arg(long, default_value = "bitcoin")]
    pub network: String,
}

#[derive(Debug, Serialize)]
pub struct DecodeReport {
    pub payload_hex: String,
    /// Present when the payload (after inflating zlib data) is valid UTF-8
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub compressed: bool,
}

impl DecodeCommand {
    pub fn execute(&self) -> AppResult<DecodeReport> {
        let payload = if !self.scripts.is_empty() {
            let seed = self.seed_txid.as_deref().ok_or_else(|| {
                AppError::InvalidData("--seed-txid is required with --script".to_string())
            })?;
            let seed = Txid::from_str(seed)
                .map_err(|e| AppError::InvalidData(format!("bad seed txid: {}", e)))?;
            let scripts = self
                .scripts
                .iter()
                .map(|s| {
                    ScriptBuf::from_hex(s)
                        .map_err(|e| AppError::InvalidData(format!("bad script hex: {}", e)))
                })
                .collect::<AppResult<Vec<_>>>()?;
            decode_pseudo_multisig(&scripts, &seed)?
        } else if !self.addresses.is_empty() {
            let network = Network::from_str(&self.network)
                .map_err(|_| AppError::InvalidData(format!("unknown network {}", self.network)))?;
            WitnessProgramAddressing::new(network).decode_addresses(&self.addresses)?
        } else {
            return Err(AppError::InvalidData(
                "give --script or --address outputs to decode".to_string(),
            ));
        };

        let inflated = inflate_if_compressed(&payload);
        let compressed = inflated != payload;
        Ok(DecodeReport {
            payload_hex: hex::encode(&payload),
            text: String::from_utf8(inflated).ok(),
            compressed,
        })
    }

    pub fn run(&self) -> AppResult<()> {
        print_json(&self.execute()?)
    }
}
