//! Unsigned transaction drafts and their PSBT form

use crate::errors::{BuildError, BuildResult};
use crate::script::{classify_script, TX_OVERHEAD_VBYTES};
use crate::types::ScriptType;
use base64::Engine;
use bitcoin::psbt::{Psbt, PsbtSighashType};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::transaction::Version;
use bitcoin::{absolute, Amount, OutPoint, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::collections::HashMap;

/// Raw parents of legacy inputs, keyed by txid
pub type ParentTransactions = HashMap<Txid, Transaction>;

/// What a signer needs to know about the output being spent
#[derive(Debug, Clone, PartialEq)]
pub enum PrevoutData {
    /// SegWit (and nested SegWit) inputs: the spent output alone
    Witness(TxOut),
    /// Legacy inputs: the whole parent transaction
    Legacy(Transaction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub outpoint: OutPoint,
    pub sequence: Sequence,
    pub value_sat: u64,
    pub script: ScriptBuf,
    pub script_type: ScriptType,
    pub prevout: PrevoutData,
    pub redeem_script: Option<ScriptBuf>,
    /// `None` means the signer's default (SIGHASH_ALL)
    pub sighash_type: Option<EcdsaSighashType>,
}

impl InputSpec {
    pub fn is_witness(&self) -> bool {
        matches!(self.prevout, PrevoutData::Witness(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub value_sat: u64,
    pub script: ScriptBuf,
}

impl OutputSpec {
    pub fn new(value_sat: u64, script: ScriptBuf) -> Self {
        Self { value_sat, script }
    }
}

/// Inputs and outputs in final order, ready to hand to a signer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TxDraft {
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl TxDraft {
    pub fn total_input_value(&self) -> u64 {
        self.inputs.iter().map(|i| i.value_sat).sum()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value_sat).sum()
    }

    /// Implied fee; `None` while outputs exceed inputs
    pub fn fee(&self) -> Option<u64> {
        self.total_input_value()
            .checked_sub(self.total_output_value())
    }

    /// Estimated vsize from classifier sizes
    pub fn estimate_vsize(&self) -> u64 {
        TX_OVERHEAD_VBYTES
            + self
                .inputs
                .iter()
                .map(|i| classify_script(&i.script).input_vbytes)
                .sum::<u64>()
            + self
                .outputs
                .iter()
                .map(|o| classify_script(&o.script).output_vbytes)
                .sum::<u64>()
    }

    pub fn unsigned_transaction(&self) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: self
                .inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: input.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: input.sequence,
                    witness: Witness::new(),
                })
                .collect(),
            output: self
                .outputs
                .iter()
                .map(|output| TxOut {
                    value: Amount::from_sat(output.value_sat),
                    script_pubkey: output.script.clone(),
                })
                .collect(),
        }
    }

    pub fn to_psbt(&self) -> BuildResult<Psbt> {
        let mut psbt = Psbt::from_unsigned_tx(self.unsigned_transaction())
            .map_err(|e| BuildError::InvalidRequest(format!("cannot create PSBT: {}", e)))?;

        for (psbt_input, spec) in psbt.inputs.iter_mut().zip(&self.inputs) {
            match &spec.prevout {
                PrevoutData::Witness(txout) => psbt_input.witness_utxo = Some(txout.clone()),
                PrevoutData::Legacy(parent) => psbt_input.non_witness_utxo = Some(parent.clone()),
            }
            psbt_input.redeem_script = spec.redeem_script.clone();
            psbt_input.sighash_type = spec.sighash_type.map(PsbtSighashType::from);
        }
        Ok(psbt)
    }

    pub fn to_psbt_hex(&self) -> BuildResult<String> {
        Ok(hex::encode(self.to_psbt()?.serialize()))
    }

    pub fn to_psbt_base64(&self) -> BuildResult<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_psbt()?.serialize()))
    }

    /// Rebuild a draft from a PSBT, e.g. a seller's listing completed elsewhere
    pub fn from_psbt(psbt: &Psbt) -> BuildResult<Self> {
        let tx = &psbt.unsigned_tx;
        let inputs = tx
            .input
            .iter()
            .zip(&psbt.inputs)
            .enumerate()
            .map(|(index, (txin, psbt_input))| {
                let (prevout, spent) = if let Some(txout) = &psbt_input.witness_utxo {
                    (PrevoutData::Witness(txout.clone()), txout.clone())
                } else if let Some(parent) = &psbt_input.non_witness_utxo {
                    let spent = parent
                        .output
                        .get(txin.previous_output.vout as usize)
                        .cloned()
                        .ok_or_else(|| {
                            BuildError::InvalidUtxoReference(format!(
                                "input {} spends missing output {}",
                                index, txin.previous_output
                            ))
                        })?;
                    (PrevoutData::Legacy(parent.clone()), spent)
                } else {
                    return Err(BuildError::InvalidRequest(format!(
                        "PSBT input {} has no UTXO information",
                        index
                    )));
                };

                Ok(InputSpec {
                    outpoint: txin.previous_output,
                    sequence: txin.sequence,
                    value_sat: spent.value.to_sat(),
                    script_type: classify_script(&spent.script_pubkey).script_type,
                    script: spent.script_pubkey,
                    prevout,
                    redeem_script: psbt_input.redeem_script.clone(),
                    sighash_type: psbt_input.sighash_type.and_then(|t| t.ecdsa_hash_ty().ok()),
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        let outputs = tx
            .output
            .iter()
            .map(|o| OutputSpec::new(o.value.to_sat(), o.script_pubkey.clone()))
            .collect();

        Ok(Self { inputs, outputs })
    }

    pub fn from_psbt_hex(psbt_hex: &str) -> BuildResult<Self> {
        let bytes = hex::decode(psbt_hex.trim())
            .map_err(|e| BuildError::InvalidRequest(format!("PSBT is not hex: {}", e)))?;
        Self::from_psbt_bytes(&bytes)
    }

    pub fn from_psbt_base64(psbt_base64: &str) -> BuildResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(psbt_base64.trim())
            .map_err(|e| BuildError::InvalidRequest(format!("PSBT is not base64: {}", e)))?;
        Self::from_psbt_bytes(&bytes)
    }

    fn from_psbt_bytes(bytes: &[u8]) -> BuildResult<Self> {
        let psbt = Psbt::deserialize(bytes)
            .map_err(|e| BuildError::InvalidRequest(format!("invalid PSBT: {}", e)))?;
        Self::from_psbt(&psbt)
    }

    /// Indices a signer must sign; restricted to inputs spending `owner` when given
    pub fn inputs_to_sign(&self, owner: Option<&Script>) -> Vec<usize> {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| owner.map_or(true, |script| input.script.as_script() == script))
            .map(|(index, _)| index)
            .collect()
    }
}
