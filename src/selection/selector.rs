//! Largest-first coin selection with sigops-rate convergence
//!
//! Candidates are sorted by value (descending) and accumulated until they
//! cover the requested outputs, the fee and a dust-safe change output. The
//! fee rate is scaled by the transaction's sigops rate, which depends on how
//! many inputs end up selected, so selection repeats until the rate it
//! assumed matches the rate it produced (bounded by `max_passes`).

use super::fee::{estimate_vsize, fee_for_vsize, sigops_rate, validate_fee_rate, SizedOutput};
use crate::errors::{BuildError, BuildResult};
use crate::script::{classify_script, ScriptInfo};
use crate::types::{OutputRequest, ScriptType, Utxo};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Rates closer than this are considered converged
pub const SIGOPS_TOLERANCE: f64 = 0.01;
pub const DEFAULT_MAX_PASSES: usize = 5;
pub const DEFAULT_DUST_THRESHOLD: u64 = 1000;

#[derive(Debug, Clone)]
pub struct SelectionOptions {
    /// Smallest change output worth creating; smaller change is folded into the fee
    pub dust_threshold: u64,
    /// Floor applied to requested output values (defaults to `dust_threshold`)
    pub output_floor: Option<u64>,
    /// Multiplier on the estimated size, e.g. 1.1 to leave room for an RBF bump
    pub rbf_size_buffer: f64,
    /// Kind the change output will have, for sizing
    pub change_script_type: ScriptType,
    pub initial_sigops_rate: f64,
    pub max_passes: usize,
    /// Drop candidates whose spend cost meets or exceeds their value
    pub filter_uneconomic_inputs: bool,
    /// Pay for low-fee unconfirmed parents (CPFP) of selected inputs
    pub include_ancestor_fees: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            output_floor: None,
            rbf_size_buffer: 1.0,
            change_script_type: ScriptType::P2WPKH,
            initial_sigops_rate: 1.0,
            max_passes: DEFAULT_MAX_PASSES,
            filter_uneconomic_inputs: true,
            include_ancestor_fees: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub inputs: Vec<Utxo>,
    /// Requested outputs after dust normalisation, in request order
    pub outputs: Vec<OutputRequest>,
    pub change_sat: u64,
    pub fee_sat: u64,
    pub sigops_rate: f64,
    /// Estimated vsize including the change output when one is created
    pub vsize: u64,
    pub converged: bool,
}

impl SelectionResult {
    pub fn total_input_value(&self) -> u64 {
        self.inputs.iter().map(|u| u.value).sum()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(OutputRequest::value_sat).sum()
    }
}

/// Prefix of the sorted candidates that covers target + fee
#[derive(Debug, Clone, Copy)]
struct Attempt {
    count: usize,
    total: u64,
    fee: u64,
    /// Fee if the leftover is not worth a change output
    fee_without_change: u64,
    vsize_with_change: u64,
    vsize_without_change: u64,
}

impl Attempt {
    fn has_change(&self, target: u64, dust_threshold: u64) -> bool {
        self.total >= target + self.fee + dust_threshold
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoinSelector {
    options: SelectionOptions,
}

impl CoinSelector {
    pub fn new(options: SelectionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    pub fn select(
        &self,
        candidates: &[Utxo],
        outputs: &[OutputRequest],
        fee_rate: f64,
    ) -> BuildResult<SelectionResult> {
        if outputs.is_empty() {
            return Err(BuildError::InvalidRequest(
                "at least one output is required".to_string(),
            ));
        }
        validate_fee_rate(fee_rate)?;
        if !self.options.rbf_size_buffer.is_finite() || self.options.rbf_size_buffer < 1.0 {
            return Err(BuildError::InvalidRequest(format!(
                "rbf size buffer must be >= 1.0, got {}",
                self.options.rbf_size_buffer
            )));
        }

        let floor = self.options.output_floor.unwrap_or(self.options.dust_threshold);
        let sized: Vec<SizedOutput> = outputs
            .iter()
            .map(|request| SizedOutput::from_request(&request.with_value(request.value_sat().max(floor))))
            .collect();
        let target: u64 = sized.iter().map(|o| o.request.value_sat()).sum();
        let multisig_outputs = sized.iter().filter(|o| o.is_multisig()).count();
        let plain_outputs = sized.len() - multisig_outputs;

        let sorted = self.prepare_candidates(candidates, fee_rate);
        if sorted.is_empty() {
            return Err(BuildError::InsufficientFunds {
                available: 0,
                required: target,
            });
        }

        let mut assumed = self.options.initial_sigops_rate;
        let mut highest = assumed;
        for pass in 1..=self.options.max_passes.max(1) {
            let attempt = self.accumulate(&sorted, &sized, target, fee_rate * assumed)?;
            let has_change = attempt.has_change(target, self.options.dust_threshold);
            let actual = sigops_rate(
                attempt.count,
                plain_outputs + usize::from(has_change),
                multisig_outputs,
            );

            if (actual - assumed).abs() <= SIGOPS_TOLERANCE {
                debug!(
                    "Selection converged on pass {} with sigops rate {:.3}",
                    pass, assumed
                );
                return Ok(self.finalize(&sorted, &sized, target, attempt, assumed, true));
            }

            debug!(
                "Sigops rate moved from {:.3} to {:.3} on pass {}, restarting selection",
                assumed, actual, pass
            );
            highest = highest.max(actual);
            assumed = actual;
        }

        warn!(
            "Sigops rate did not converge within {} passes, using highest observed rate {:.3}",
            self.options.max_passes, highest
        );
        let attempt = self.accumulate(&sorted, &sized, target, fee_rate * highest)?;
        Ok(self.finalize(&sorted, &sized, target, attempt, highest, false))
    }

    /// Classify, drop uneconomic inputs and sort largest-first
    fn prepare_candidates(&self, candidates: &[Utxo], fee_rate: f64) -> Vec<(Utxo, ScriptInfo)> {
        let spend_rate = fee_rate * self.options.rbf_size_buffer * self.options.initial_sigops_rate;
        let mut sorted: Vec<(Utxo, ScriptInfo)> = candidates
            .iter()
            .map(|utxo| {
                let info = if utxo.has_script() {
                    classify_script(&utxo.script)
                } else {
                    ScriptInfo::for_type(utxo.script_type)
                };
                (utxo.clone(), info)
            })
            .filter(|(utxo, info)| {
                let spend_cost = fee_for_vsize(info.input_vbytes, spend_rate);
                let keep = !self.options.filter_uneconomic_inputs || utxo.value > spend_cost;
                if !keep {
                    debug!(
                        "Skipping uneconomic UTXO {}:{} ({} sats, spend cost {} sats)",
                        utxo.txid, utxo.vout, utxo.value, spend_cost
                    );
                }
                keep
            })
            .collect();

        sorted.sort_by(|(a, _), (b, _)| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.txid.cmp(&b.txid))
                .then_with(|| a.vout.cmp(&b.vout))
        });
        sorted
    }

    fn accumulate(
        &self,
        sorted: &[(Utxo, ScriptInfo)],
        outputs: &[SizedOutput],
        target: u64,
        rate_before_buffer: f64,
    ) -> BuildResult<Attempt> {
        let effective_rate = rate_before_buffer * self.options.rbf_size_buffer;
        let change_info = ScriptInfo::for_type(self.options.change_script_type);

        let mut total = 0u64;
        let mut without_change = None;
        let mut last = None;
        for index in 0..sorted.len() {
            total += sorted[index].0.value;
            let selected = &sorted[..=index];
            let infos = || selected.iter().map(|(_, info)| info);
            let vsize_with_change = estimate_vsize(infos(), outputs, Some(&change_info));
            let vsize_without_change = estimate_vsize(infos(), outputs, None);
            let ancestor_bump = self.ancestor_fee_bump(selected, rate_before_buffer);

            let attempt = Attempt {
                count: index + 1,
                total,
                fee: fee_for_vsize(vsize_with_change, effective_rate) + ancestor_bump,
                fee_without_change: fee_for_vsize(vsize_without_change, effective_rate)
                    + ancestor_bump,
                vsize_with_change,
                vsize_without_change,
            };
            if attempt.has_change(target, self.options.dust_threshold) {
                return Ok(attempt);
            }
            // Keep looking for a prefix that also pays for change
            if without_change.is_none() && total >= target + attempt.fee_without_change {
                without_change = Some(attempt);
            }
            last = Some(attempt);
        }

        if let Some(attempt) = without_change {
            return Ok(attempt);
        }
        match last {
            Some(attempt) => Err(BuildError::InsufficientFunds {
                available: attempt.total,
                required: target + attempt.fee_without_change,
            }),
            None => Err(BuildError::InsufficientFunds {
                available: 0,
                required: target,
            }),
        }
    }

    /// Extra fee so low-rate unconfirmed parents reach the requested rate
    fn ancestor_fee_bump(&self, selected: &[(Utxo, ScriptInfo)], fee_rate: f64) -> u64 {
        if !self.options.include_ancestor_fees {
            return 0;
        }
        let mut seen = HashSet::new();
        selected
            .iter()
            .filter(|(utxo, _)| seen.insert(utxo.txid))
            .filter_map(|(utxo, _)| utxo.ancestor.as_ref())
            .filter(|ancestor| ancestor.effective_rate_sat_per_vb < fee_rate)
            .map(|ancestor| {
                ((fee_rate - ancestor.effective_rate_sat_per_vb) * ancestor.vsize_bytes as f64).ceil()
                    as u64
            })
            .sum()
    }

    fn finalize(
        &self,
        sorted: &[(Utxo, ScriptInfo)],
        outputs: &[SizedOutput],
        target: u64,
        attempt: Attempt,
        rate: f64,
        converged: bool,
    ) -> SelectionResult {
        let (fee, change, vsize) = if attempt.has_change(target, self.options.dust_threshold) {
            let change = attempt.total - target - attempt.fee;
            (attempt.fee, change, attempt.vsize_with_change)
        } else {
            let fee = attempt.total - target;
            let folded = fee.saturating_sub(attempt.fee_without_change);
            if folded > 0 {
                info!(
                    "Folding {} sats of leftover into the fee (change threshold {})",
                    folded, self.options.dust_threshold
                );
            }
            (fee, 0, attempt.vsize_without_change)
        };

        SelectionResult {
            inputs: sorted[..attempt.count]
                .iter()
                .map(|(utxo, _)| utxo.clone())
                .collect(),
            outputs: outputs.iter().map(|o| o.request.clone()).collect(),
            change_sat: change,
            fee_sat: fee,
            sigops_rate: rate,
            vsize,
            converged,
        }
    }
}
