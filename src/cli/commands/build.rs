use super::{print_json, read_utxos, Compression, EncodingMode, PayloadArgs, ProviderArgs};
use crate::builder::{StampRequest, StampTransactionBuilder};
use crate::errors::AppResult;
use crate::types::parse_utxo_ref;
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

/// Build an unsigned stamp transaction (PSBT)
#[derive(Args)]
pub struct BuildCommand {
    /// Address funding the transaction
    #[arg(long)]
    pub source: String,

    /// Receives the leading dust output (defaults to --source)
    #[arg(long)]
    pub recipient: Option<String>,

    /// Change address (defaults to the first input's own script)
    #[arg(long)]
    pub change: Option<String>,

    #[command(flatten)]
    pub payload: PayloadArgs,

    /// sat/vB
    #[arg(long)]
    pub fee_rate: f64,

    #[arg(long, value_enum, default_value_t = EncodingMode::Multisig)]
    pub mode: EncodingMode,

    #[arg(long, value_enum, default_value_t = Compression::None)]
    pub compress: Compression,

    /// Use these UTXOs (JSON) instead of querying providers
    #[arg(long)]
    pub utxos: Option<PathBuf>,

    /// `txid:vout` never to spend, repeatable
    #[arg(long)]
    pub exclude: Vec<String>,

    #[arg(long)]
    pub confirmed_only: bool,

    /// Pay for low-fee unconfirmed parents
    #[arg(long)]
    pub ancestors: bool,

    #[command(flatten)]
    pub providers: ProviderArgs,
}

impl BuildCommand {
    pub fn request(&self) -> AppResult<StampRequest> {
        let exclude = self
            .exclude
            .iter()
            .map(|r| parse_utxo_ref(r))
            .collect::<Result<HashSet<_>, _>>()?;
        let candidates = match &self.utxos {
            Some(path) => Some(read_utxos(path)?),
            None => None,
        };

        Ok(StampRequest {
            source_address: self.source.clone(),
            recipient_address: self.recipient.clone(),
            payload: self.payload.read()?,
            fee_rate: self.fee_rate,
            change_address: self.change.clone(),
            candidates,
            exclude,
            confirmed_only: self.confirmed_only,
            include_ancestors: self.ancestors,
        })
    }

    pub async fn run(&self) -> AppResult<()> {
        let config = self.providers.load_config()?;
        let gateway = self.providers.gateway(&config)?;
        let builder = StampTransactionBuilder::new(gateway, config.transaction)?
            .with_payload_encoder(self.compress.encoder());

        let request = self.request()?;
        info!(
            "Building {:?} stamp from {} ({} payload bytes) at {} sat/vB",
            self.mode,
            request.source_address,
            request.payload.len(),
            request.fee_rate
        );

        let built = match self.mode {
            EncodingMode::Multisig => builder.build_multisig(&request).await?,
            EncodingMode::Addresses => builder.build_with_addresses(&request).await?,
        };
        print_json(&built)
    }
}
