//! Subcommands and the argument groups they share

pub mod build;
pub mod decode;
pub mod encode;
pub mod fetch;
pub mod select;
pub mod trade;

use crate::config::{AppConfig, PrimaryProviderConfig};
use crate::encoder::{PassThrough, PayloadEncoder, ZlibPayloadEncoder};
use crate::errors::{AppError, AppResult};
use crate::provider::DataProviderGateway;
use crate::types::Utxo;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the payload comes from (exactly one)
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// UTF-8 text payload
    #[arg(long)]
    pub text: Option<String>,

    /// Hex payload
    #[arg(long)]
    pub hex: Option<String>,

    /// Read the payload bytes from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn read(&self) -> AppResult<Vec<u8>> {
        if let Some(text) = &self.text {
            return Ok(text.as_bytes().to_vec());
        }
        if let Some(hex_payload) = &self.hex {
            return Ok(hex::decode(hex_payload.trim())?);
        }
        if let Some(path) = &self.file {
            return Ok(std::fs::read(path)?);
        }
        Err(AppError::InvalidData("no payload given".to_string()))
    }
}

/// Data output encoding
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// 1-of-3 pseudo-multisig outputs
    #[default]
    Multisig,
    /// Version-0 witness program addresses
    Addresses,
}

/// Pre-framing compression
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

impl Compression {
    pub fn encoder(self) -> Arc<dyn PayloadEncoder> {
        match self {
            Compression::None => Arc::new(PassThrough),
            Compression::Zlib => Arc::new(ZlibPayloadEncoder::default()),
        }
    }
}

/// Provider and network overrides for config.toml
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Primary JSON-RPC endpoint (overrides config.toml)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// API key appended to the primary endpoint
    #[arg(long)]
    pub rpc_api_key: Option<String>,

    /// Explorer base URL, repeatable; replaces the configured list
    #[arg(long = "explorer")]
    pub explorers: Vec<String>,

    /// bitcoin, testnet, signet or regtest (overrides config.toml)
    #[arg(long)]
    pub network: Option<String>,
}

impl ProviderArgs {
    /// Configuration with CLI overrides applied
    pub fn load_config(&self) -> AppResult<AppConfig> {
        let mut config = AppConfig::get_defaults()?;
        if let Some(url) = &self.rpc_url {
            let primary = config.providers.primary.get_or_insert_with(|| PrimaryProviderConfig {
                url: url.clone(),
                api_key: None,
                max_retries: 3,
                retry_delay_ms: 1000,
            });
            primary.url = url.clone();
        }
        if let Some(key) = &self.rpc_api_key {
            if let Some(primary) = config.providers.primary.as_mut() {
                primary.api_key = Some(key.clone());
            }
        }
        if !self.explorers.is_empty() {
            config.providers.explorers = self.explorers.clone();
        }
        if let Some(network) = &self.network {
            config.transaction.network = network.clone();
        }
        config.transaction.network()?;
        Ok(config)
    }

    pub fn gateway(&self, config: &AppConfig) -> AppResult<Arc<DataProviderGateway>> {
        Ok(Arc::new(DataProviderGateway::from_config(&config.providers)?))
    }
}

/// JSON array of UTXOs as produced by `fetch utxos`
pub fn read_utxos(path: &Path) -> AppResult<Vec<Utxo>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
