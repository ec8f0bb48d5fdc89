/// Script classification and size estimation
///
/// Pure, total functions: every script or address maps to a `ScriptType`
/// (possibly `Unknown`) together with the vbyte estimates the coin selector
/// and trade completion use for fee calculation.
pub mod classifier;

pub use classifier::{
    classify_address, classify_script, is_bare_multisig, output_vbytes_for_script,
    require_address, ScriptInfo, TX_OVERHEAD_VBYTES,
};
