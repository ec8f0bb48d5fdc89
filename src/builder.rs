//! End-to-end stamp transaction construction
//!
//! candidates -> enrichment -> selection (data outputs sized up front) ->
//! encoding -> parent fetch -> assembly -> PSBT. Any failure aborts the whole
//! build; callers never see a partial draft.

use crate::assembly::{ChangeTarget, OutputSpec, TransactionAssembler, TxDraft};
use crate::config::TransactionConfig;
use crate::encoder::{
    encode_as_addresses, multisig_chunk_count, placeholder_script, AddressingCollaborator,
    PassThrough, PayloadEncoder, PseudoMultisigEncoder, WitnessProgramAddressing,
};
use crate::errors::{AppResult, BuildError, BuildResult};
use crate::provider::{DataProviderGateway, UtxoQuery};
use crate::script::{classify_address, classify_script};
use crate::selection::{CoinSelector, SelectionOptions, SelectionResult};
use crate::types::{OutputRequest, ScriptType, Utxo};
use bitcoin::{Network, OutPoint, Txid};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Lowest value any requested output is lifted to (P2WSH/P2TR relay dust)
pub const MIN_OUTPUT_VALUE: u64 = 330;

#[derive(Debug, Clone, Default)]
pub struct StampRequest {
    pub source_address: String,
    /// Receives the leading dust output; defaults to the source address
    pub recipient_address: Option<String>,
    pub payload: Vec<u8>,
    /// sat/vB
    pub fee_rate: f64,
    /// Change goes back to the primary input's script when unset
    pub change_address: Option<String>,
    /// Use these instead of asking providers for the source address's UTXOs
    pub candidates: Option<Vec<Utxo>>,
    pub exclude: HashSet<OutPoint>,
    pub confirmed_only: bool,
    /// Account for unconfirmed parents' fee deficit
    pub include_ancestors: bool,
}

impl StampRequest {
    fn recipient(&self) -> &str {
        self.recipient_address
            .as_deref()
            .unwrap_or(&self.source_address)
    }

    fn query(&self) -> UtxoQuery {
        UtxoQuery {
            confirmed_only: self.confirmed_only,
            include_ancestors: self.include_ancestors,
            exclude: self.exclude.clone(),
        }
    }

    fn change_target(&self) -> ChangeTarget {
        match &self.change_address {
            Some(address) => ChangeTarget::Address(address.clone()),
            None => ChangeTarget::PrimaryInput,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltTransaction {
    #[serde(skip)]
    pub draft: TxDraft,
    pub psbt_hex: String,
    pub psbt_base64: String,
    pub fee_sat: u64,
    pub change_sat: u64,
    pub vsize: u64,
    pub sigops_rate: f64,
    pub converged: bool,
    pub inputs_to_sign: Vec<usize>,
    pub data_output_count: usize,
    /// Keystream seed; equals the first input's txid
    pub seed_txid: Txid,
}

pub struct StampTransactionBuilder {
    gateway: Arc<DataProviderGateway>,
    config: TransactionConfig,
    network: Network,
    assembler: TransactionAssembler,
    encoder: PseudoMultisigEncoder,
    payload_encoder: Arc<dyn PayloadEncoder>,
    addressing: Arc<dyn AddressingCollaborator>,
}

impl StampTransactionBuilder {
    pub fn new(gateway: Arc<DataProviderGateway>, config: TransactionConfig) -> AppResult<Self> {
        let network = config.network()?;
        let burn_pattern = config.burn_pattern()?;
        Ok(Self {
            gateway,
            assembler: TransactionAssembler::new(network, config.enable_rbf),
            encoder: PseudoMultisigEncoder::new(burn_pattern),
            payload_encoder: Arc::new(PassThrough),
            addressing: Arc::new(WitnessProgramAddressing::new(network)),
            network,
            config,
        })
    }

    pub fn with_payload_encoder(mut self, encoder: Arc<dyn PayloadEncoder>) -> Self {
        self.payload_encoder = encoder;
        self
    }

    pub fn with_addressing(mut self, addressing: Arc<dyn AddressingCollaborator>) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn with_multisig_encoder(mut self, encoder: PseudoMultisigEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Data in 1-of-3 pseudo-multisig outputs keyed by the first input's txid
    pub async fn build_multisig(&self, request: &StampRequest) -> BuildResult<BuiltTransaction> {
        let payload = self.prepare_payload(request)?;
        let data_count = multisig_chunk_count(payload.len());
        let placeholder = placeholder_script(self.encoder.burn_pattern());
        let data_requests = (0..data_count)
            .map(|_| OutputRequest::ToScript {
                script: placeholder.clone(),
                value_sat: self.config.multisig_dust,
            })
            .collect();

        let (selection, candidates_used) = self.select(request, data_requests).await?;
        let seed = selection.inputs[0].txid;
        debug!("Selected {} of {} candidates", selection.inputs.len(), candidates_used);

        let scripts = self.encoder.encode(&payload, &seed)?;
        if scripts.len() != data_count {
            return Err(BuildError::InvalidPayload(format!(
                "encoded {} outputs, sized {}",
                scripts.len(),
                data_count
            )));
        }
        let data_outputs = scripts
            .iter()
            .zip(&selection.outputs[1..=data_count])
            .map(|(script, sized)| OutputSpec::new(sized.value_sat(), script.to_script()))
            .collect();

        self.finish(request, &selection, data_outputs, data_count).await
    }

    /// Data in witness-program addresses from the addressing collaborator
    pub async fn build_with_addresses(&self, request: &StampRequest) -> BuildResult<BuiltTransaction> {
        let payload = self.prepare_payload(request)?;
        let addresses = encode_as_addresses(&payload, self.addressing.as_ref())?;
        let data_count = addresses.len();
        let data_requests = addresses
            .into_iter()
            .map(|address| OutputRequest::ToAddress {
                address,
                value_sat: self.config.data_address_dust,
            })
            .collect();

        let (selection, _) = self.select(request, data_requests).await?;
        let data_outputs = selection.outputs[1..=data_count]
            .iter()
            .map(|sized| self.assembler.request_output(sized))
            .collect::<BuildResult<Vec<_>>>()?;

        self.finish(request, &selection, data_outputs, data_count).await
    }

    fn prepare_payload(&self, request: &StampRequest) -> BuildResult<Vec<u8>> {
        if request.payload.is_empty() {
            return Err(BuildError::InvalidRequest("payload is empty".to_string()));
        }
        // Fail on bad addresses before touching providers
        crate::script::require_address(&request.source_address, self.network)?;
        crate::script::require_address(request.recipient(), self.network)?;
        if let Some(change) = &request.change_address {
            crate::script::require_address(change, self.network)?;
        }
        self.payload_encoder.encode(&request.payload)
    }

    async fn candidates(&self, request: &StampRequest) -> BuildResult<Vec<Utxo>> {
        let query = request.query();
        let basic = match &request.candidates {
            Some(supplied) => supplied.clone(),
            None => {
                self.gateway
                    .try_get_utxos(&request.source_address, &query)
                    .await?
            }
        };
        self.gateway.enrich_utxos(basic, &query).await
    }

    /// Outputs in final order: recipient, data, service fee
    async fn select(
        &self,
        request: &StampRequest,
        data_requests: Vec<OutputRequest>,
    ) -> BuildResult<(SelectionResult, usize)> {
        let mut outputs = vec![OutputRequest::ToAddress {
            address: request.recipient().to_string(),
            value_sat: self.config.recipient_dust,
        }];
        outputs.extend(data_requests);
        if let Some(service_fee) = &self.config.service_fee {
            outputs.push(OutputRequest::ToAddress {
                address: service_fee.address.clone(),
                value_sat: service_fee.sats,
            });
        }

        let candidates = self.candidates(request).await?;
        let change_script_type = self.change_script_type(request, &candidates);

        let selector = CoinSelector::new(SelectionOptions {
            dust_threshold: self.config.dust_threshold,
            output_floor: Some(MIN_OUTPUT_VALUE),
            rbf_size_buffer: self.config.rbf_size_buffer,
            change_script_type,
            include_ancestor_fees: request.include_ancestors,
            ..SelectionOptions::default()
        });

        let selection = selector.select(&candidates, &outputs, request.fee_rate)?;
        Ok((selection, candidates.len()))
    }

    /// Kind of the change output, sized from where change will actually go
    fn change_script_type(&self, request: &StampRequest, candidates: &[Utxo]) -> ScriptType {
        let kind = match &request.change_address {
            Some(address) => classify_address(address, self.network).script_type,
            // Change returns to the primary input, which largest-first selection picks first
            None => candidates
                .iter()
                .min_by(|a, b| {
                    b.value
                        .cmp(&a.value)
                        .then_with(|| a.txid.cmp(&b.txid))
                        .then_with(|| a.vout.cmp(&b.vout))
                })
                .map_or(ScriptType::Unknown, |primary| {
                    classify_script(&primary.script).script_type
                }),
        };
        match kind {
            ScriptType::Unknown | ScriptType::Multisig => ScriptType::P2WPKH,
            known => known,
        }
    }

    async fn finish(
        &self,
        request: &StampRequest,
        selection: &SelectionResult,
        data_outputs: Vec<OutputSpec>,
        data_count: usize,
    ) -> BuildResult<BuiltTransaction> {
        let parents = self
            .gateway
            .fetch_parent_transactions(&selection.inputs)
            .await?;

        let recipient = self.assembler.request_output(&selection.outputs[0])?;
        let fee_output = match self.config.service_fee {
            Some(_) => selection
                .outputs
                .last()
                .map(|fee| self.assembler.request_output(fee))
                .transpose()?,
            None => None,
        };
        let change = if selection.change_sat > 0 {
            Some(self.assembler.change_output(
                &request.change_target(),
                &selection.inputs[0],
                selection.change_sat,
            )?)
        } else {
            None
        };

        let draft = self.assembler.assemble(
            &selection.inputs,
            &parents,
            data_outputs,
            recipient,
            fee_output,
            change,
        )?;

        let built = BuiltTransaction {
            psbt_hex: draft.to_psbt_hex()?,
            psbt_base64: draft.to_psbt_base64()?,
            fee_sat: selection.fee_sat,
            change_sat: selection.change_sat,
            vsize: selection.vsize,
            sigops_rate: selection.sigops_rate,
            converged: selection.converged,
            inputs_to_sign: draft.inputs_to_sign(None),
            data_output_count: data_count,
            seed_txid: selection.inputs[0].txid,
            draft,
        };
        info!(
            "Built stamp transaction: {} inputs, {} data outputs, fee {} sats, change {} sats",
            built.draft.inputs.len(),
            data_count,
            built.fee_sat,
            built.change_sat
        );
        Ok(built)
    }
}
