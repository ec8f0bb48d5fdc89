use crate::common::fixtures::{enriched_utxo, parent_tx};
use crate::common::{SOURCE_ADDRESS, SOURCE_SCRIPT};
use anyhow::{bail, Result};
use clap::Parser;
use data_carry_builder::cli::{Cli, Commands};
use data_carry_builder::cli::commands::fetch::FetchCommands;
use data_carry_builder::cli::commands::trade::TradeCommands;
use data_carry_builder::cli::commands::EncodingMode;
use std::io::Write;

const SEED: &str = "3b6d8f7e1a0c4d2e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4c3d2e1f0a9b8c7d6e";

fn parse(args: &[&str]) -> Result<Commands> {
    let mut argv = vec!["data-carry-builder"];
    argv.extend_from_slice(args);
    Ok(Cli::try_parse_from(argv)?.command)
}

#[test]
fn test_build_arguments_parse() -> Result<()> {
    let Commands::Build(build) = parse(&[
        "build",
        "--source",
        SOURCE_ADDRESS,
        "--text",
        "hello",
        "--fee-rate",
        "12.5",
        "--mode",
        "addresses",
        "--exclude",
        "3b6d8f7e1a0c4d2e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4c3d2e1f0a9b8c7d6e:1",
        "--explorer",
        "https://mempool.space/api",
    ])?
    else {
        bail!("expected build");
    };

    assert_eq!(build.mode, EncodingMode::Addresses);
    assert_eq!(build.providers.explorers, vec!["https://mempool.space/api"]);
    let request = build.request()?;
    assert_eq!(request.payload, b"hello");
    assert_eq!(request.fee_rate, 12.5);
    assert_eq!(request.exclude.len(), 1);
    assert!(request.candidates.is_none());
    Ok(())
}

#[test]
fn test_payload_sources_are_exclusive() {
    let result = parse(&[
        "encode", "--text", "a", "--hex", "61", "--seed-txid", SEED,
    ]);
    assert!(result.is_err());
}

#[test]
fn test_fetch_and_trade_arguments_parse() -> Result<()> {
    let Commands::Fetch(FetchCommands::Utxos {
        address,
        confirmed_only,
        ..
    }) = parse(&["fetch", "utxos", SOURCE_ADDRESS, "--confirmed-only"])?
    else {
        bail!("expected fetch utxos");
    };
    assert_eq!(address, SOURCE_ADDRESS);
    assert!(confirmed_only);

    let Commands::Trade(TradeCommands::Complete { buyer_utxos, .. }) = parse(&[
        "trade",
        "complete",
        "--psbt",
        "cHNidP8=",
        "--buyer-utxo",
        &format!("{}:0", SEED),
        "--buyer-utxo",
        &format!("{}:2", SEED),
        "--change-address",
        SOURCE_ADDRESS,
        "--fee-rate",
        "4",
    ])?
    else {
        bail!("expected trade complete");
    };
    assert_eq!(buyer_utxos.len(), 2);

    // buyer inputs are mandatory
    assert!(parse(&[
        "trade",
        "complete",
        "--psbt",
        "cHNidP8=",
        "--change-address",
        SOURCE_ADDRESS,
        "--fee-rate",
        "4",
    ])
    .is_err());
    Ok(())
}

#[test]
fn test_encode_then_decode_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all("{\"p\":\"src-20\",\"op\":\"mint\",\"tick\":\"KEVIN\",\"amt\":\"1\"}".as_bytes())?;
    let path = file.path().to_string_lossy().to_string();

    let Commands::Encode(encode) = parse(&["encode", "--file", &path, "--seed-txid", SEED])? else {
        bail!("expected encode");
    };
    let encoded = encode.execute()?;
    // 51 bytes fit one 62-byte chunk after framing
    assert_eq!(encoded.payload_bytes, 51);
    assert_eq!(encoded.outputs.len(), 1);
    assert_eq!(encoded.keys_valid, Some(true));

    let mut args = vec!["decode".to_string()];
    for script in &encoded.outputs {
        args.push("--script".to_string());
        args.push(script.clone());
    }
    args.extend(["--seed-txid".to_string(), SEED.to_string()]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let Commands::Decode(decode) = parse(&args)? else {
        bail!("expected decode");
    };

    let decoded = decode.execute()?;
    assert!(!decoded.compressed);
    assert_eq!(
        decoded.text.as_deref(),
        Some("{\"p\":\"src-20\",\"op\":\"mint\",\"tick\":\"KEVIN\",\"amt\":\"1\"}")
    );
    Ok(())
}

#[test]
fn test_compressed_address_round_trip() -> Result<()> {
    let text = "stamp ".repeat(40);
    let Commands::Encode(encode) = parse(&[
        "encode",
        "--text",
        &text,
        "--mode",
        "addresses",
        "--compress",
        "zlib",
    ])?
    else {
        bail!("expected encode");
    };
    let encoded = encode.execute()?;
    assert!(encoded.encoded_bytes < encoded.payload_bytes);
    assert!(encoded.outputs.iter().all(|a| a.starts_with("bc1q")));

    let mut args = vec!["decode".to_string()];
    for address in &encoded.outputs {
        args.push("--address".to_string());
        args.push(address.clone());
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let Commands::Decode(decode) = parse(&args)? else {
        bail!("expected decode");
    };

    let decoded = decode.execute()?;
    assert!(decoded.compressed);
    assert_eq!(decoded.text, Some(text));
    Ok(())
}

#[test]
fn test_select_over_utxo_file() -> Result<()> {
    let parent = parent_tx(SOURCE_SCRIPT, &[50_000, 8_000], 40);
    let utxos = vec![enriched_utxo(&parent, 0, 3), enriched_utxo(&parent, 1, 3)];
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string(&utxos)?.as_bytes())?;
    let path = file.path().to_string_lossy().to_string();
    let to = format!("{}:20000", SOURCE_ADDRESS);

    let Commands::Select(select) =
        parse(&["select", "--utxos", &path, "--to", &to, "--fee-rate", "10"])?
    else {
        bail!("expected select");
    };
    let result = select.execute()?;

    assert_eq!(result.inputs.len(), 1);
    assert_eq!(result.inputs[0].value, 50_000);
    assert_eq!(
        result.total_input_value(),
        result.total_output_value() + result.change_sat + result.fee_sat
    );
    assert!(result.change_sat >= 1000);

    let Commands::Select(select) = parse(&[
        "select", "--utxos", &path, "--to", &to, "--fee-rate", "10", "--change-type", "bogus",
    ])?
    else {
        bail!("expected select");
    };
    assert!(select.execute().is_err());
    Ok(())
}
