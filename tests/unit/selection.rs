use crate::common::fixtures::{enriched_utxo, parent_tx};
use crate::common::{LEGACY_SCRIPT, SOURCE_ADDRESS, SOURCE_SCRIPT};
use data_carry_builder::encoder::placeholder_script;
use data_carry_builder::errors::BuildError;
use data_carry_builder::selection::{CoinSelector, SelectionOptions, SelectionResult};
use data_carry_builder::types::{OutputRequest, StampsBurnPattern, Utxo};

fn candidates(script_hex: &str, values: &[u64]) -> Vec<Utxo> {
    let tx = parent_tx(script_hex, values, 1);
    (0..values.len() as u32)
        .map(|vout| enriched_utxo(&tx, vout, 3))
        .collect()
}

fn pay(value_sat: u64) -> OutputRequest {
    OutputRequest::ToAddress {
        address: SOURCE_ADDRESS.to_string(),
        value_sat,
    }
}

fn data_output() -> OutputRequest {
    OutputRequest::ToScript {
        script: placeholder_script(StampsBurnPattern::default()),
        value_sat: 809,
    }
}

fn assert_invariants(result: &SelectionResult, dust: u64) {
    assert_eq!(
        result.total_input_value(),
        result.total_output_value() + result.change_sat + result.fee_sat
    );
    assert!(result.change_sat == 0 || result.change_sat >= dust);
    assert!(result.fee_sat > 0);
}

#[test]
fn test_largest_first_scenario() {
    let utxos = candidates(SOURCE_SCRIPT, &[10_000, 100_000, 50_000]);
    let result = CoinSelector::default()
        .select(&utxos, &[pay(120_000)], 10.0)
        .unwrap();

    let mut values: Vec<u64> = result.inputs.iter().map(|u| u.value).collect();
    values.sort_unstable();
    assert_eq!(values, vec![50_000, 100_000]);
    assert!(result.change_sat > 0);
    assert_eq!(
        result.total_output_value() + result.change_sat + result.fee_sat,
        150_000
    );
}

#[test]
fn test_insufficient_single_input() {
    let utxos = candidates(SOURCE_SCRIPT, &[1_000]);
    let result = CoinSelector::default().select(&utxos, &[pay(10_000)], 1.0);
    assert!(matches!(result, Err(BuildError::InsufficientFunds { .. })));
}

#[test]
fn test_invariants_hold_across_mixed_requests() {
    let options = SelectionOptions {
        output_floor: Some(330),
        ..SelectionOptions::default()
    };
    let selector = CoinSelector::new(options);
    let cases: Vec<(Vec<u64>, Vec<OutputRequest>, f64)> = vec![
        (vec![20_000], vec![pay(789), data_output()], 1.0),
        (vec![5_000, 5_000, 5_000], vec![pay(789), data_output(), data_output()], 7.5),
        (vec![250_000, 3_000], vec![pay(100_000)], 35.0),
        (vec![12_345, 6_789], vec![pay(789), data_output(), pay(2_000)], 3.2),
    ];

    for (values, outputs, fee_rate) in cases {
        let utxos = candidates(SOURCE_SCRIPT, &values);
        let result = selector.select(&utxos, &outputs, fee_rate).unwrap();
        assert_invariants(&result, 1000);
        assert!(result.converged);
    }
}

#[test]
fn test_legacy_inputs_cost_more() {
    let witness = CoinSelector::default()
        .select(&candidates(SOURCE_SCRIPT, &[100_000]), &[pay(10_000)], 5.0)
        .unwrap();
    let legacy = CoinSelector::default()
        .select(&candidates(LEGACY_SCRIPT, &[100_000]), &[pay(10_000)], 5.0)
        .unwrap();
    assert!(legacy.fee_sat > witness.fee_sat);
    assert_eq!(legacy.vsize - witness.vsize, 148 - 68);
}

#[test]
fn test_data_outputs_weight_sigops_rate() {
    let options = SelectionOptions {
        output_floor: Some(330),
        ..SelectionOptions::default()
    };
    let result = CoinSelector::new(options)
        .select(
            &candidates(SOURCE_SCRIPT, &[100_000]),
            &[pay(789), data_output(), data_output(), data_output()],
            2.0,
        )
        .unwrap();
    // 1 input + recipient + change plain, 3 data outputs weighted 3x
    assert!((result.sigops_rate - 12.0 / 6.0).abs() < 1e-9);
    assert_eq!(result.outputs[1].value_sat(), 809);
    assert_invariants(&result, 1000);
}

#[test]
fn test_no_outputs_is_a_caller_error() {
    let result = CoinSelector::default().select(&candidates(SOURCE_SCRIPT, &[10_000]), &[], 1.0);
    assert!(matches!(result, Err(BuildError::InvalidRequest(_))));
}

#[test]
fn test_non_positive_fee_rate_rejected() {
    let utxos = candidates(SOURCE_SCRIPT, &[10_000]);
    for rate in [0.0, -1.0, f64::NAN] {
        let result = CoinSelector::default().select(&utxos, &[pay(1_000)], rate);
        assert!(matches!(result, Err(BuildError::InvalidRequest(_))));
    }
}
