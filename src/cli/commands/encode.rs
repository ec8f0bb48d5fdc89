use super::{print_json, Compression, EncodingMode, PayloadArgs};
use crate::crypto::pubkey::validate_pubkeys;
use crate::encoder::{encode_as_addresses, PseudoMultisigEncoder, WitnessProgramAddressing};
use crate::errors::{AppError, AppResult};
use crate::types::StampsBurnPattern;
use bitcoin::{Network, Txid};
use clap::Args;
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

/// Encode a payload into pseudo-multisig scripts or data addresses
#[derive(Args)]
pub struct EncodeCommand {
    #[command(flatten)]
    pub payload: PayloadArgs,

    #[arg(long, value_enum, default_value_t = EncodingMode::Multisig)]
    pub mode: EncodingMode,

    /// Keystream seed (the transaction's first input txid); multisig mode only
    #[arg(long)]
    pub seed_txid: Option<String>,

    /// Third key: pattern name (e.g. stamps0202) or 33-byte hex
    #[arg(long, default_value = "stamps0202")]
    pub burn_key: String,

    #[arg(long, value_enum, default_value_t = Compression::None)]
    pub compress: Compression,

    #[arg(long, default_value = "bitcoin")]
    pub network: String,
}

#[derive(Debug, Serialize)]
pub struct EncodeReport {
    pub payload_bytes: usize,
    pub encoded_bytes: usize,
    /// Script hex (multisig) or addresses
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_valid: Option<bool>,
}

impl EncodeCommand {
    pub fn execute(&self) -> AppResult<EncodeReport> {
        let raw = self.payload.read()?;
        let encoded = self.compress.encoder().encode(&raw)?;

        let report = match self.mode {
            EncodingMode::Multisig => {
                let seed = self.seed_txid.as_deref().ok_or_else(|| {
                    AppError::InvalidData("--seed-txid is required in multisig mode".to_string())
                })?;
                let seed = Txid::from_str(seed)
                    .map_err(|e| AppError::InvalidData(format!("bad seed txid: {}", e)))?;
                let burn = StampsBurnPattern::from_str(&self.burn_key).map_err(AppError::InvalidData)?;

                let scripts = PseudoMultisigEncoder::new(burn).encode(&encoded, &seed)?;
                let keys: Vec<[u8; 33]> = scripts.iter().flat_map(|s| s.data_keys).collect();
                let validation = validate_pubkeys(&keys);
                info!("{}", validation.summary());

                EncodeReport {
                    payload_bytes: raw.len(),
                    encoded_bytes: encoded.len(),
                    outputs: scripts
                        .iter()
                        .map(|s| s.to_script().to_hex_string())
                        .collect(),
                    keys_valid: Some(validation.all_valid_ec_points),
                }
            }
            EncodingMode::Addresses => {
                let network = Network::from_str(&self.network)
                    .map_err(|_| AppError::InvalidData(format!("unknown network {}", self.network)))?;
                EncodeReport {
                    payload_bytes: raw.len(),
                    encoded_bytes: encoded.len(),
                    outputs: encode_as_addresses(&encoded, &WitnessProgramAddressing::new(network))?,
                    keys_valid: None,
                }
            }
        };
        Ok(report)
    }

    pub fn run(&self) -> AppResult<()> {
        print_json(&self.execute()?)
    }
}
