use super::{print_json, read_utxos};
use crate::errors::{AppError, AppResult};
use crate::selection::{CoinSelector, SelectionOptions, SelectionResult};
use crate::types::{OutputRequest, ScriptType};
use bitcoin::ScriptBuf;
use clap::Args;
use std::path::PathBuf;

/// Run coin selection over a JSON list of UTXOs
#[derive(Args)]
pub struct SelectCommand {
    /// JSON array of UTXOs (the output of `fetch utxos --enrich`)
    #[arg(long)]
    pub utxos: PathBuf,

    /// `address:sats`, repeatable
    #[arg(long = "to")]
    pub to_addresses: Vec<String>,

    /// `script_hex:sats`, repeatable
    #[arg(long = "to-script")]
    pub to_scripts: Vec<String>,

    /// sat/vB
    #[arg(long)]
    pub fee_rate: f64,

    #[arg(long, default_value = "1000")]
    pub dust_threshold: u64,

    /// Lowest value a requested output is raised to (defaults to the dust threshold)
    #[arg(long)]
    pub output_floor: Option<u64>,

    #[arg(long, default_value = "1.0")]
    pub rbf_size_buffer: f64,

    /// Kind of the change output, for sizing
    #[arg(long, default_value = "p2wpkh")]
    pub change_type: String,

    /// Pay for low-fee unconfirmed parents
    #[arg(long)]
    pub ancestors: bool,
}

/// Split `destination:sats` on the last colon
fn split_output(spec: &str) -> AppResult<(&str, u64)> {
    let (destination, value) = spec
        .rsplit_once(':')
        .ok_or_else(|| AppError::InvalidData(format!("expected destination:sats, got {}", spec)))?;
    let value = value
        .parse()
        .map_err(|_| AppError::InvalidData(format!("bad output value in {}", spec)))?;
    Ok((destination, value))
}

impl SelectCommand {
    pub fn outputs(&self) -> AppResult<Vec<OutputRequest>> {
        let mut outputs = Vec::new();
        for spec in &self.to_addresses {
            let (address, value_sat) = split_output(spec)?;
            outputs.push(OutputRequest::ToAddress {
                address: address.to_string(),
                value_sat,
            });
        }
        for spec in &self.to_scripts {
            let (script_hex, value_sat) = split_output(spec)?;
            let script = ScriptBuf::from_hex(script_hex)
                .map_err(|e| AppError::InvalidData(format!("bad script hex: {}", e)))?;
            outputs.push(OutputRequest::ToScript { script, value_sat });
        }
        Ok(outputs)
    }

    pub fn execute(&self) -> AppResult<SelectionResult> {
        let candidates = read_utxos(&self.utxos)?;
        let change_script_type = self.change_type.parse().unwrap_or(ScriptType::Unknown);
        if change_script_type == ScriptType::Unknown {
            return Err(AppError::InvalidData(format!(
                "unsupported change type {}",
                self.change_type
            )));
        }

        let selector = CoinSelector::new(SelectionOptions {
            dust_threshold: self.dust_threshold,
            output_floor: self.output_floor,
            rbf_size_buffer: self.rbf_size_buffer,
            change_script_type,
            include_ancestor_fees: self.ancestors,
            ..SelectionOptions::default()
        });
        Ok(selector.select(&candidates, &self.outputs()?, self.fee_rate)?)
    }

    pub fn run(&self) -> AppResult<()> {
        print_json(&self.execute()?)
    }
}
