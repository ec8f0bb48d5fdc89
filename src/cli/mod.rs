use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Bitcoin Stamps Transaction Builder
#[derive(Parser)]
#[command(name = "data-carry-builder")]
#[command(about = "Build Bitcoin transactions that carry stamp payloads")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Encode a payload into pseudo-multisig scripts or data addresses
    Encode(commands::encode::EncodeCommand),
    /// Recover a payload from pseudo-multisig scripts or data addresses
    Decode(commands::decode::DecodeCommand),
    /// Run coin selection over a JSON list of UTXOs
    Select(commands::select::SelectCommand),
    /// Query the provider chain
    #[command(subcommand)]
    Fetch(commands::fetch::FetchCommands),
    /// Build an unsigned stamp transaction (PSBT)
    Build(commands::build::BuildCommand),
    /// Two-party listing and purchase
    #[command(subcommand)]
    Trade(commands::trade::TradeCommands),
}

pub async fn run() -> AppResult<()> {
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode(command) => command.run(),
        Commands::Decode(command) => command.run(),
        Commands::Select(command) => command.run(),
        Commands::Fetch(command) => command.run().await,
        Commands::Build(command) => command.run().await,
        Commands::Trade(command) => command.run().await,
    }
}
