//! Command-line front end of the compliance harness
//!
//! Connects to a PC/SC reader, waits for a card, downloads the terminal
//! profile and runs the OMAPI scenarios, stopping at the first failure.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sects::{ChannelSession, HarnessConfig, OmapiTest, Scenario};
use sects_apdu_core::{CardExecutor, GetResponseProcessor};
use sects_transport_pcsc::{ConnectStrategy, PcscConfig, PcscDeviceManager, PcscError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use the PC/SC reader at this index (0 when given without a value)
    #[arg(
        short,
        long,
        value_name = "INDEX",
        num_args = 0..=1,
        default_missing_value = "0"
    )]
    pcsc: Option<usize>,

    /// Use the PC/SC reader with this name
    #[arg(short, long, conflicts_with = "pcsc")]
    reader: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every APDU exchanged
    #[arg(short, long)]
    verbose: bool,

    /// Skip the TERMINAL PROFILE download
    #[arg(long)]
    no_terminal_profile: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected readers
    ListReaders,

    /// Run the compliance scenarios (default)
    Run {
        /// Only run these scenarios
        #[arg(long, value_enum)]
        only: Vec<Scenario>,
    },
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    // Initialize the tracing logger with env_format and ansi
    let filter = if cli.verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();

    let mut config = HarnessConfig::load(cli.config.as_deref())?;
    if let Some(index) = cli.pcsc {
        config.reader.index = index;
        config.reader.name = None;
    }
    if let Some(name) = cli.reader {
        config.reader.name = Some(name);
    }
    if cli.no_terminal_profile {
        config.terminal_profile = false;
    }

    let manager = PcscDeviceManager::new()?;

    match cli.command {
        Some(Commands::ListReaders) => list_readers(&manager),
        Some(Commands::Run { only }) if !only.is_empty() => run(&manager, &config, &only),
        _ => run(&manager, &config, &config.scenarios),
    }
}

fn list_readers(manager: &PcscDeviceManager) -> eyre::Result<()> {
    let readers = match manager.list_readers() {
        Ok(readers) => readers,
        Err(PcscError::NoReadersAvailable) => {
            println!("No readers found.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = match reader.atr() {
            Some(atr) => format!("card present, ATR {}", hex::encode_upper(atr)),
            None => "no card".to_string(),
        };
        println!("{}. {} ({})", i, reader.name(), status);
    }
    Ok(())
}

fn run(
    manager: &PcscDeviceManager,
    config: &HarnessConfig,
    scenarios: &[Scenario],
) -> eyre::Result<()> {
    let strategy = match &config.reader.name {
        Some(name) => ConnectStrategy::Reader(name.clone()),
        None => ConnectStrategy::Index(config.reader.index),
    };

    let mut transport = manager.connect_strategy(strategy, PcscConfig::default())?;
    transport.wait_for_card(config.card_timeout())?;
    info!(
        reader = transport.reader_name(),
        atr = %hex::encode_upper(transport.atr()?),
        "Card connected"
    );

    let executor =
        CardExecutor::with_processor(transport, GetResponseProcessor::new(config.max_chain));
    let mut session = ChannelSession::new(executor);

    if config.terminal_profile {
        session.send_terminal_profile()?;
    }

    OmapiTest::new(&mut session, &config.aids).execute(scenarios)?;

    println!("All scenarios passed.");
    Ok(())
}
