use super::{print_json, ProviderArgs};
use crate::assembly::{TradeAssembler, TransactionAssembler, TxDraft};
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::provider::DataProviderGateway;
use crate::types::{parse_utxo_ref, Utxo};
use bitcoin::ScriptBuf;
use clap::Subcommand;
use serde_json::json;
use tracing::info;

/// Two-party listing and purchase
#[derive(Subcommand, Clone)]
pub enum TradeCommands {
    /// Seller: sign-ready listing with SINGLE|ANYONECANPAY
    List {
        /// Output being sold, `txid:vout`
        #[arg(long)]
        utxo: String,

        /// Asking price in sats
        #[arg(long)]
        price: u64,

        /// Address the price is paid to
        #[arg(long)]
        seller_address: String,

        /// Redeem script hex for P2SH inputs
        #[arg(long)]
        redeem_script: Option<String>,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Buyer: fund a listing and add change
    Complete {
        /// Listing PSBT, base64 or hex
        #[arg(long)]
        psbt: String,

        /// Funding `txid:vout`, repeatable
        #[arg(long = "buyer-utxo", required = true)]
        buyer_utxos: Vec<String>,

        #[arg(long)]
        change_address: String,

        /// sat/vB
        #[arg(long)]
        fee_rate: f64,

        #[command(flatten)]
        providers: ProviderArgs,
    },
}

fn trade_assembler(config: &AppConfig) -> AppResult<TradeAssembler> {
    Ok(TradeAssembler::new(
        TransactionAssembler::new(config.transaction.network()?, config.transaction.enable_rbf),
        config.transaction.dust_threshold,
    ))
}

async fn fetch_outputs(gateway: &DataProviderGateway, refs: &[String]) -> AppResult<Vec<Utxo>> {
    let mut utxos = Vec::with_capacity(refs.len());
    for reference in refs {
        let outpoint = parse_utxo_ref(reference)?;
        let utxo = gateway
            .try_get_utxo(&outpoint.txid, outpoint.vout, false)
            .await?
            .ok_or_else(|| AppError::InvalidData(format!("{} not found", outpoint)))?;
        utxos.push(utxo);
    }
    Ok(utxos)
}

/// Hex when every character is a hex digit, base64 otherwise
pub fn parse_listing(psbt: &str) -> AppResult<TxDraft> {
    let trimmed = psbt.trim();
    let draft = if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        TxDraft::from_psbt_hex(trimmed)?
    } else {
        TxDraft::from_psbt_base64(trimmed)?
    };
    Ok(draft)
}

impl TradeCommands {
    pub async fn run(&self) -> AppResult<()> {
        match self {
            TradeCommands::List {
                utxo,
                price,
                seller_address,
                redeem_script,
                providers,
            } => {
                let config = providers.load_config()?;
                let gateway = providers.gateway(&config)?;
                let redeem_script = redeem_script
                    .as_deref()
                    .map(ScriptBuf::from_hex)
                    .transpose()
                    .map_err(|e| AppError::InvalidData(format!("bad redeem script: {}", e)))?;

                let seller = fetch_outputs(&gateway, std::slice::from_ref(utxo)).await?;
                let parents = gateway.fetch_parent_transactions(&seller).await?;
                let listing = trade_assembler(&config)?.create_listing(
                    &seller[0],
                    &parents,
                    *price,
                    seller_address,
                    redeem_script,
                )?;

                print_json(&json!({
                    "price_sat": price,
                    "psbt_hex": listing.to_psbt_hex()?,
                    "psbt_base64": listing.to_psbt_base64()?,
                }))
            }
            TradeCommands::Complete {
                psbt,
                buyer_utxos,
                change_address,
                fee_rate,
                providers,
            } => {
                let config = providers.load_config()?;
                let gateway = providers.gateway(&config)?;
                let listing = parse_listing(psbt)?;

                let buyer = fetch_outputs(&gateway, buyer_utxos).await?;
                let parents = gateway.fetch_parent_transactions(&buyer).await?;
                let completion = trade_assembler(&config)?.complete_purchase(
                    &listing,
                    &buyer,
                    &parents,
                    change_address,
                    *fee_rate,
                )?;
                info!(
                    "Purchase funded by {} inputs, fee {} sats",
                    completion.buyer_inputs.len(),
                    completion.fee_sat
                );

                print_json(&json!({
                    "fee_sat": completion.fee_sat,
                    "change_sat": completion.change_sat,
                    "vsize": completion.vsize,
                    "buyer_inputs": completion.buyer_inputs,
                    "psbt_hex": completion.draft.to_psbt_hex()?,
                    "psbt_base64": completion.draft.to_psbt_base64()?,
                }))
            }
        }
    }
}
