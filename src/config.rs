use crate::types::StampsBurnPattern;
use bitcoin::Network;
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub transaction: TransactionConfig,
}

/// Provider chain: optional JSON-RPC primary followed by explorers in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub primary: Option<PrimaryProviderConfig>,
    pub explorers: Vec<String>,
    pub request_timeout_seconds: u64,
    /// Upper bound on parallel fetches during enrichment
    pub concurrent_requests: usize,
    pub utxo_cache_ttl_seconds: u64,
    /// Deadline for a whole fan-out, not a single request
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryProviderConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Total attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceFeeConfig {
    pub address: String,
    pub sats: u64,
}

/// Dust values and output policy for built transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// bitcoin, testnet, signet or regtest
    pub network: String,
    /// Change at or below this is folded into the fee
    pub dust_threshold: u64,
    pub recipient_dust: u64,
    pub multisig_dust: u64,
    pub data_address_dust: u64,
    pub rbf_size_buffer: f64,
    pub enable_rbf: bool,
    /// Third pseudo-multisig key: pattern name or 33-byte hex
    pub burn_key: String,
    #[serde(default)]
    pub service_fee: Option<ServiceFeeConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: None,
            explorers: vec![
                "https://mempool.space/api".to_string(),
                "https://blockstream.info/api".to_string(),
            ],
            request_timeout_seconds: 30,
            concurrent_requests: 10,
            utxo_cache_ttl_seconds: 60,
            fetch_timeout_seconds: 120,
        }
    }
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn utxo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.utxo_cache_ttl_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            network: "bitcoin".to_string(),
            dust_threshold: 1000,
            recipient_dust: 789,
            multisig_dust: 809,
            data_address_dust: 420,
            rbf_size_buffer: 1.0,
            enable_rbf: true,
            burn_key: StampsBurnPattern::default().key_hex(),
            service_fee: None,
        }
    }
}

impl TransactionConfig {
    pub fn network(&self) -> Result<Network, ConfigError> {
        Network::from_str(&self.network).map_err(|_| {
            ConfigError::Message(format!("Unknown network '{}'", self.network))
        })
    }

    pub fn burn_pattern(&self) -> Result<StampsBurnPattern, ConfigError> {
        StampsBurnPattern::from_str(&self.burn_key).map_err(|_| {
            ConfigError::Message(format!("'{}' is not a known stamps burn key", self.burn_key))
        })
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables (STAMPS__SECTION__KEY) take precedence over the file
    pub fn load() -> Result<Self, ConfigError> {
        let providers = ProvidersConfig::default();
        let transaction = TransactionConfig::default();
        let config = Config::builder()
            .set_default("providers.explorers", providers.explorers)?
            .set_default(
                "providers.request_timeout_seconds",
                providers.request_timeout_seconds,
            )?
            .set_default(
                "providers.concurrent_requests",
                providers.concurrent_requests as i64,
            )?
            .set_default(
                "providers.utxo_cache_ttl_seconds",
                providers.utxo_cache_ttl_seconds,
            )?
            .set_default(
                "providers.fetch_timeout_seconds",
                providers.fetch_timeout_seconds,
            )?
            .set_default("transaction.network", transaction.network)?
            .set_default("transaction.dust_threshold", transaction.dust_threshold)?
            .set_default("transaction.recipient_dust", transaction.recipient_dust)?
            .set_default("transaction.multisig_dust", transaction.multisig_dust)?
            .set_default(
                "transaction.data_address_dust",
                transaction.data_address_dust,
            )?
            .set_default("transaction.rbf_size_buffer", transaction.rbf_size_buffer)?
            .set_default("transaction.enable_rbf", transaction.enable_rbf)?
            .set_default("transaction.burn_key", transaction.burn_key)?
            // Load from config.toml if it exists
            .add_source(File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("STAMPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.transaction.network()?;
        app_config.transaction.burn_pattern()?;
        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(_) => Ok(Self {
                providers: ProvidersConfig::default(),
                transaction: TransactionConfig::default(),
            }),
        }
    }
}
