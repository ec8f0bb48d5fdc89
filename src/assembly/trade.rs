//! Two-party marketplace flow
//!
//! The seller signs their single input with SIGHASH_SINGLE|ANYONECANPAY,
//! committing only to the payment output at the same index. The buyer then
//! appends funding inputs and, if it clears dust, a change output.

use super::assembler::TransactionAssembler;
use super::draft::{OutputSpec, ParentTransactions, TxDraft};
use crate::errors::{BuildError, BuildResult};
use crate::script::classify_script;
use crate::selection::fee::{fee_for_vsize, validate_fee_rate};
use crate::types::Utxo;
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::ScriptBuf;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct TradeCompletion {
    #[serde(skip)]
    pub draft: TxDraft,
    pub fee_sat: u64,
    pub change_sat: u64,
    pub vsize: u64,
    /// Inputs the buyer must sign
    pub buyer_inputs: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct TradeAssembler {
    assembler: TransactionAssembler,
    dust_threshold: u64,
}

impl TradeAssembler {
    pub fn new(assembler: TransactionAssembler, dust_threshold: u64) -> Self {
        Self {
            assembler,
            dust_threshold,
        }
    }

    /// Seller side: one input, one payment output, SINGLE|ANYONECANPAY
    pub fn create_listing(
        &self,
        seller_utxo: &Utxo,
        parents: &ParentTransactions,
        price_sat: u64,
        seller_address: &str,
        redeem_script: Option<ScriptBuf>,
    ) -> BuildResult<TxDraft> {
        let input = self.assembler.input_spec(
            seller_utxo,
            parents,
            redeem_script,
            Some(EcdsaSighashType::SinglePlusAnyoneCanPay),
        )?;
        let payment = self.assembler.address_output(seller_address, price_sat)?;

        info!(
            "Listing {}:{} for {} sats",
            seller_utxo.txid, seller_utxo.vout, price_sat
        );
        Ok(TxDraft {
            inputs: vec![input],
            outputs: vec![payment],
        })
    }

    /// Buyer side: append funding inputs, recompute the fee and add change if it clears dust
    pub fn complete_purchase(
        &self,
        listing: &TxDraft,
        buyer_utxos: &[Utxo],
        parents: &ParentTransactions,
        buyer_change_address: &str,
        fee_rate: f64,
    ) -> BuildResult<TradeCompletion> {
        validate_fee_rate(fee_rate)?;
        if buyer_utxos.is_empty() {
            return Err(BuildError::InvalidRequest(
                "buyer must supply at least one input".to_string(),
            ));
        }

        let mut draft = listing.clone();
        let first_buyer_input = draft.inputs.len();
        for utxo in buyer_utxos {
            draft
                .inputs
                .push(self.assembler.input_spec(utxo, parents, None, None)?);
        }

        let total_in = draft.total_input_value();
        let total_out = draft.total_output_value();
        if total_out > total_in {
            return Err(BuildError::OutputsExceedInputs {
                inputs: total_in,
                outputs: total_out,
            });
        }

        let change_template = self.assembler.address_output(buyer_change_address, 0)?;
        let change_vbytes = classify_script(&change_template.script).output_vbytes;
        let vsize_without_change = draft.estimate_vsize();
        let vsize_with_change = vsize_without_change + change_vbytes;
        let fee_with_change = fee_for_vsize(vsize_with_change, fee_rate);

        let buyer_inputs = (first_buyer_input..draft.inputs.len()).collect();
        if total_in >= total_out + fee_with_change + self.dust_threshold {
            let change_sat = total_in - total_out - fee_with_change;
            draft
                .outputs
                .push(OutputSpec::new(change_sat, change_template.script));
            debug!(
                "Trade completed with {} sats change, fee {} sats",
                change_sat, fee_with_change
            );
            return Ok(TradeCompletion {
                draft,
                fee_sat: fee_with_change,
                change_sat,
                vsize: vsize_with_change,
                buyer_inputs,
            });
        }

        let fee_without_change = fee_for_vsize(vsize_without_change, fee_rate);
        if total_in < total_out + fee_without_change {
            return Err(BuildError::InsufficientFunds {
                available: total_in,
                required: total_out + fee_without_change,
            });
        }

        let fee_sat = total_in - total_out;
        info!(
            "Buyer remainder below dust, absorbing {} sats into the fee",
            fee_sat - fee_without_change
        );
        Ok(TradeCompletion {
            draft,
            fee_sat,
            change_sat: 0,
            vsize: vsize_without_change,
            buyer_inputs,
        })
    }
}
