use crate::errors::{BuildError, BuildResult};
use crate::types::ScriptType;
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, Script};
use serde::Serialize;
use std::str::FromStr;

/// version(4) + locktime(4) + input/output count varints(2) + segwit marker/flag (0.5, rounded up)
pub const TX_OVERHEAD_VBYTES: u64 = 11;

/// outpoint(36) + scriptSig length(1) + sequence(4)
const BASE_INPUT_VBYTES: u64 = 41;

/// value(8) + script length varint(1)
const OUTPUT_HEADER_VBYTES: u64 = 9;

/// Signature (72) + pubkey (33) + item counts
const P2WPKH_WITNESS_BYTES: u64 = 108;
/// 2-of-3 style witness script spend
const P2WSH_WITNESS_BYTES: u64 = 252;
/// Schnorr key-path spend
const P2TR_WITNESS_BYTES: u64 = 66;
/// scriptSig pushing the nested P2WPKH redeem script
const P2SH_P2WPKH_SCRIPT_SIG_BYTES: u64 = 23;
/// scriptSig with DER signature + compressed pubkey
const P2PKH_SCRIPT_SIG_BYTES: u64 = 107;

/// Kind of a script plus its spend/create cost in vbytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptInfo {
    pub script_type: ScriptType,
    pub input_vbytes: u64,
    pub output_vbytes: u64,
}

impl ScriptInfo {
    /// Estimates for a kind when only the kind is known (no concrete script)
    pub fn for_type(script_type: ScriptType) -> Self {
        Self {
            script_type,
            input_vbytes: input_vbytes(script_type),
            output_vbytes: OUTPUT_HEADER_VBYTES + typical_script_len(script_type),
        }
    }
}

fn witness_vbytes(witness_bytes: u64) -> u64 {
    BASE_INPUT_VBYTES + witness_bytes.div_ceil(4)
}

fn input_vbytes(script_type: ScriptType) -> u64 {
    match script_type {
        ScriptType::P2WPKH => witness_vbytes(P2WPKH_WITNESS_BYTES),
        ScriptType::P2WSH => witness_vbytes(P2WSH_WITNESS_BYTES),
        ScriptType::P2TR => witness_vbytes(P2TR_WITNESS_BYTES),
        ScriptType::P2SH => {
            witness_vbytes(P2WPKH_WITNESS_BYTES) + P2SH_P2WPKH_SCRIPT_SIG_BYTES
        }
        // Unknown and bare multisig fall back to the largest standard estimate
        ScriptType::P2PKH | ScriptType::Multisig | ScriptType::Unknown => {
            BASE_INPUT_VBYTES + P2PKH_SCRIPT_SIG_BYTES
        }
    }
}

fn typical_script_len(script_type: ScriptType) -> u64 {
    match script_type {
        ScriptType::P2PKH => 25,
        ScriptType::P2SH => 23,
        ScriptType::P2WPKH => 22,
        ScriptType::P2WSH | ScriptType::P2TR => 34,
        // 1-of-3 with compressed keys
        ScriptType::Multisig => 105,
        ScriptType::Unknown => 25,
    }
}

/// Output size for a concrete script: value + length byte + script
pub fn output_vbytes_for_script(script: &Script) -> u64 {
    OUTPUT_HEADER_VBYTES + script.len() as u64
}

/// Classify a script by exact byte-length/prefix match
pub fn classify_script(script: &Script) -> ScriptInfo {
    let bytes = script.as_bytes();
    let script_type = match bytes {
        [0x76, 0xa9, 0x14, .., 0x88, 0xac] if bytes.len() == 25 => ScriptType::P2PKH,
        [0xa9, 0x14, .., 0x87] if bytes.len() == 23 => ScriptType::P2SH,
        [0x00, 0x14, ..] if bytes.len() == 22 => ScriptType::P2WPKH,
        [0x00, 0x20, ..] if bytes.len() == 34 => ScriptType::P2WSH,
        [0x51, 0x20, ..] if bytes.len() == 34 => ScriptType::P2TR,
        _ if is_bare_multisig(bytes) => ScriptType::Multisig,
        _ => ScriptType::Unknown,
    };

    ScriptInfo {
        script_type,
        input_vbytes: input_vbytes(script_type),
        output_vbytes: output_vbytes_for_script(script),
    }
}

/// `OP_m <33/65-byte keys...> OP_n OP_CHECKMULTISIG` with m <= n <= 16
pub fn is_bare_multisig(bytes: &[u8]) -> bool {
    let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if last != 0xae || bytes.len() < 3 || !(0x51..=0x60).contains(&first) {
        return false;
    }
    let n_op = bytes[bytes.len() - 2];
    if !(0x51..=0x60).contains(&n_op) {
        return false;
    }
    let required = (first - 0x50) as usize;
    let total = (n_op - 0x50) as usize;
    if required > total {
        return false;
    }

    let body = &bytes[1..bytes.len() - 2];
    let mut cursor = 0;
    let mut keys = 0;
    while cursor < body.len() {
        let push = body[cursor] as usize;
        if push != 33 && push != 65 {
            return false;
        }
        cursor += 1 + push;
        keys += 1;
    }
    cursor == body.len() && keys == total
}

/// Classify an address string; parse failures or a wrong network yield `Unknown`
pub fn classify_address(address: &str, network: Network) -> ScriptInfo {
    match Address::<NetworkUnchecked>::from_str(address) {
        Ok(unchecked) if unchecked.is_valid_for_network(network) => {
            classify_script(&unchecked.assume_checked().script_pubkey())
        }
        _ => ScriptInfo::for_type(ScriptType::Unknown),
    }
}

/// Strict address parse used when the result must be spendable/payable
pub fn require_address(address: &str, network: Network) -> BuildResult<Address> {
    let unchecked = Address::<NetworkUnchecked>::from_str(address).map_err(|e| {
        BuildError::UnsupportedScriptType(format!("unparseable address '{}': {}", address, e))
    })?;

    if !unchecked.is_valid_for_network(network) {
        return Err(BuildError::NetworkMismatch {
            address: address.to_string(),
            expected: network.to_string(),
        });
    }

    let checked = unchecked.assume_checked();
    if classify_script(&checked.script_pubkey()).script_type == ScriptType::Unknown {
        return Err(BuildError::UnsupportedScriptType(format!(
            "address '{}' has an unsupported script kind",
            address
        )));
    }
    Ok(checked)
}
