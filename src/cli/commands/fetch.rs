use super::{print_json, ProviderArgs};
use crate::errors::{AppError, AppResult};
use crate::provider::UtxoQuery;
use crate::types::parse_utxo_ref;
use bitcoin::{consensus, Transaction, Txid};
use clap::Subcommand;
use serde_json::json;
use std::str::FromStr;
use tracing::info;

/// Fetch command types
#[derive(Subcommand, Clone)]
pub enum FetchCommands {
    /// Unspent outputs of an address
    Utxos {
        address: String,

        /// Drop unconfirmed outputs
        #[arg(long)]
        confirmed_only: bool,

        /// Fill in scripts and kinds from parent transactions
        #[arg(long)]
        enrich: bool,

        /// Attach unconfirmed-parent fee facts (implies --enrich)
        #[arg(long)]
        ancestors: bool,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// A single output by `txid:vout`
    Utxo {
        outpoint: String,

        #[arg(long)]
        ancestors: bool,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Raw transaction hex
    Tx {
        txid: String,

        #[command(flatten)]
        providers: ProviderArgs,
    },
}

impl FetchCommands {
    pub async fn run(&self) -> AppResult<()> {
        match self {
            FetchCommands::Utxos {
                address,
                confirmed_only,
                enrich,
                ancestors,
                providers,
            } => {
                let config = providers.load_config()?;
                let gateway = providers.gateway(&config)?;
                let query = UtxoQuery {
                    confirmed_only: *confirmed_only,
                    include_ancestors: *ancestors,
                    ..UtxoQuery::default()
                };

                let mut utxos = gateway.try_get_utxos(address, &query).await?;
                if *enrich || *ancestors {
                    utxos = gateway.enrich_utxos(utxos, &query).await?;
                }
                info!("{} UTXOs for {}", utxos.len(), address);
                print_json(&utxos)
            }
            FetchCommands::Utxo {
                outpoint,
                ancestors,
                providers,
            } => {
                let outpoint = parse_utxo_ref(outpoint)?;
                let config = providers.load_config()?;
                let gateway = providers.gateway(&config)?;
                let utxo = gateway
                    .try_get_utxo(&outpoint.txid, outpoint.vout, *ancestors)
                    .await?
                    .ok_or_else(|| AppError::InvalidData(format!("{} not found", outpoint)))?;
                print_json(&utxo)
            }
            FetchCommands::Tx { txid, providers } => {
                let txid = Txid::from_str(txid)
                    .map_err(|e| AppError::InvalidData(format!("bad txid: {}", e)))?;
                let config = providers.load_config()?;
                let gateway = providers.gateway(&config)?;
                let raw = gateway
                    .try_get_raw_tx(&txid)
                    .await?
                    .ok_or_else(|| AppError::InvalidData(format!("{} not found", txid)))?;
                let tx: Transaction = consensus::deserialize(&raw)
                    .map_err(|e| AppError::InvalidData(format!("undecodable transaction: {}", e)))?;
                print_json(&json!({
                    "txid": txid,
                    "size": raw.len(),
                    "inputs": tx.input.len(),
                    "outputs": tx.output.len(),
                    "hex": hex::encode(&raw),
                }))
            }
        }
    }
}
