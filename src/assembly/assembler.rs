//! Wires selected inputs and encoded outputs into a `TxDraft`
//!
//! Output order is fixed: recipient, data outputs, service fee, change.
//! Witness-kind inputs carry only the spent output; legacy inputs carry the
//! full parent transaction, which must already be fetched.

use super::draft::{InputSpec, OutputSpec, ParentTransactions, PrevoutData, TxDraft};
use crate::errors::{BuildError, BuildResult};
use crate::script::{classify_script, require_address};
use crate::types::{OutputRequest, ScriptType, Utxo};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{Amount, Network, ScriptBuf, Sequence, TxOut};
use tracing::debug;

/// Where change goes
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeTarget {
    Address(String),
    /// Back to the primary (first) input's own script
    PrimaryInput,
}

#[derive(Debug, Clone)]
pub struct TransactionAssembler {
    network: Network,
    enable_rbf: bool,
}

impl TransactionAssembler {
    pub fn new(network: Network, enable_rbf: bool) -> Self {
        Self {
            network,
            enable_rbf,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn sequence(&self) -> Sequence {
        if self.enable_rbf {
            Sequence::ENABLE_RBF_NO_LOCKTIME
        } else {
            Sequence::MAX
        }
    }

    /// Populate an input with the prevout data its script kind needs
    pub fn input_spec(
        &self,
        utxo: &Utxo,
        parents: &ParentTransactions,
        redeem_script: Option<ScriptBuf>,
        sighash_type: Option<EcdsaSighashType>,
    ) -> BuildResult<InputSpec> {
        let parent = parents.get(&utxo.txid);
        let script = if utxo.has_script() {
            utxo.script.clone()
        } else {
            parent
                .and_then(|tx| tx.output.get(utxo.vout as usize))
                .map(|out| out.script_pubkey.clone())
                .ok_or_else(|| {
                    BuildError::InvalidUtxoReference(format!(
                        "{}:{} has no script and no parent transaction",
                        utxo.txid, utxo.vout
                    ))
                })?
        };

        let script_type = match classify_script(&script).script_type {
            ScriptType::Unknown => utxo.script_type,
            known => known,
        };

        let prevout = if script_type.is_witness() {
            PrevoutData::Witness(TxOut {
                value: Amount::from_sat(utxo.value),
                script_pubkey: script.clone(),
            })
        } else {
            let parent = parent.ok_or_else(|| BuildError::MissingPreviousTransaction {
                txid: utxo.txid.to_string(),
            })?;
            if parent.compute_txid() != utxo.txid {
                return Err(BuildError::InvalidUtxoReference(format!(
                    "parent bytes hash to {}, expected {}",
                    parent.compute_txid(),
                    utxo.txid
                )));
            }
            let spent = parent.output.get(utxo.vout as usize).ok_or_else(|| {
                BuildError::InvalidUtxoReference(format!(
                    "{} has no output {}",
                    utxo.txid, utxo.vout
                ))
            })?;
            if spent.value.to_sat() != utxo.value {
                return Err(BuildError::InvalidUtxoReference(format!(
                    "{}:{} is worth {} sats on chain, not {}",
                    utxo.txid,
                    utxo.vout,
                    spent.value.to_sat(),
                    utxo.value
                )));
            }
            PrevoutData::Legacy(parent.clone())
        };

        Ok(InputSpec {
            outpoint: utxo.outpoint(),
            sequence: self.sequence(),
            value_sat: utxo.value,
            script,
            script_type,
            prevout,
            redeem_script,
            sighash_type,
        })
    }

    pub fn address_output(&self, address: &str, value_sat: u64) -> BuildResult<OutputSpec> {
        let address = require_address(address, self.network)?;
        Ok(OutputSpec::new(value_sat, address.script_pubkey()))
    }

    pub fn request_output(&self, request: &OutputRequest) -> BuildResult<OutputSpec> {
        match request {
            OutputRequest::ToAddress { address, value_sat } => {
                self.address_output(address, *value_sat)
            }
            OutputRequest::ToScript { script, value_sat } => {
                Ok(OutputSpec::new(*value_sat, script.clone()))
            }
        }
    }

    /// Change script kind matches the target (explicit address or primary input)
    pub fn change_output(
        &self,
        target: &ChangeTarget,
        primary: &Utxo,
        value_sat: u64,
    ) -> BuildResult<OutputSpec> {
        match target {
            ChangeTarget::Address(address) => self.address_output(address, value_sat),
            ChangeTarget::PrimaryInput => {
                let kind = classify_script(&primary.script).script_type;
                match kind {
                    ScriptType::P2PKH
                    | ScriptType::P2SH
                    | ScriptType::P2WPKH
                    | ScriptType::P2WSH
                    | ScriptType::P2TR => Ok(OutputSpec::new(value_sat, primary.script.clone())),
                    ScriptType::Multisig | ScriptType::Unknown => {
                        Err(BuildError::UnsupportedScriptType(format!(
                            "cannot derive change from {} input {}:{}",
                            kind, primary.txid, primary.vout
                        )))
                    }
                }
            }
        }
    }

    /// Compose the final draft; rejects drafts whose outputs exceed their inputs
    pub fn assemble(
        &self,
        inputs: &[Utxo],
        parents: &ParentTransactions,
        data_outputs: Vec<OutputSpec>,
        recipient: OutputSpec,
        fee_output: Option<OutputSpec>,
        change: Option<OutputSpec>,
    ) -> BuildResult<TxDraft> {
        if inputs.is_empty() {
            return Err(BuildError::InvalidRequest(
                "cannot assemble a transaction without inputs".to_string(),
            ));
        }

        let inputs = inputs
            .iter()
            .map(|utxo| self.input_spec(utxo, parents, None, None))
            .collect::<BuildResult<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(data_outputs.len() + 3);
        outputs.push(recipient);
        outputs.extend(data_outputs);
        outputs.extend(fee_output);
        outputs.extend(change);

        let draft = TxDraft { inputs, outputs };
        let (total_in, total_out) = (draft.total_input_value(), draft.total_output_value());
        if total_out > total_in {
            return Err(BuildError::OutputsExceedInputs {
                inputs: total_in,
                outputs: total_out,
            });
        }

        debug!(
            "Assembled draft: {} inputs ({} legacy), {} outputs, implied fee {} sats",
            draft.inputs.len(),
            draft.inputs.iter().filter(|i| !i.is_witness()).count(),
            draft.outputs.len(),
            total_in - total_out
        );
        Ok(draft)
    }
}
