use crate::errors::{BuildError, BuildResult};
use crate::script::{classify_address, classify_script, ScriptInfo, TX_OVERHEAD_VBYTES};
use crate::types::{OutputRequest, ScriptType};
use bitcoin::Network;

/// A requested output with its classified size
#[derive(Debug, Clone)]
pub struct SizedOutput {
    pub request: OutputRequest,
    pub info: ScriptInfo,
}

impl SizedOutput {
    /// Address outputs are sized without a network check; assembly enforces the network
    pub fn from_request(request: &OutputRequest) -> Self {
        let info = match request {
            OutputRequest::ToScript { script, .. } => classify_script(script),
            OutputRequest::ToAddress { address, .. } => {
                let any_network = [
                    Network::Bitcoin,
                    Network::Testnet,
                    Network::Signet,
                    Network::Regtest,
                ]
                .into_iter()
                .map(|network| classify_address(address, network))
                .find(|info| info.script_type != ScriptType::Unknown);
                any_network.unwrap_or_else(|| ScriptInfo::for_type(ScriptType::Unknown))
            }
        };
        Self {
            request: request.clone(),
            info,
        }
    }

    pub fn is_multisig(&self) -> bool {
        self.info.script_type == ScriptType::Multisig
    }
}

/// Weighted signature-operation rate; data (multisig) outputs count 3x
pub fn sigops_rate(num_inputs: usize, num_plain_outputs: usize, num_multisig_outputs: usize) -> f64 {
    let denominator = num_inputs + num_plain_outputs + num_multisig_outputs;
    if denominator == 0 {
        return 1.0;
    }
    let numerator = num_inputs + num_plain_outputs + 3 * num_multisig_outputs;
    numerator as f64 / denominator as f64
}

/// Estimated vsize of a transaction with the given inputs/outputs and optional change
pub fn estimate_vsize<'a, I>(input_vbytes: I, outputs: &[SizedOutput], change: Option<&ScriptInfo>) -> u64
where
    I: IntoIterator<Item = &'a ScriptInfo>,
{
    TX_OVERHEAD_VBYTES
        + input_vbytes.into_iter().map(|i| i.input_vbytes).sum::<u64>()
        + outputs.iter().map(|o| o.info.output_vbytes).sum::<u64>()
        + change.map_or(0, |c| c.output_vbytes)
}

/// `ceil(vsize * rate)` in whole satoshis
pub fn fee_for_vsize(vsize: u64, effective_rate: f64) -> u64 {
    (vsize as f64 * effective_rate).ceil() as u64
}

pub fn validate_fee_rate(fee_rate: f64) -> BuildResult<()> {
    if !fee_rate.is_finite() || fee_rate <= 0.0 {
        return Err(BuildError::InvalidRequest(format!(
            "fee rate must be a positive number, got {}",
            fee_rate
        )));
    }
    Ok(())
}
