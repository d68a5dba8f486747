//! Ledger network orchestrator
//!
//! Brings a multi-organization ledger network up from a declarative file and
//! runs chaincode transactions against it.
//!
//! # Architecture Overview
//!
//! ```text
//!   network.toml ──▶ config ──▶ topology (orgs, peers, orderers, channels)
//!                                   │
//!                                   ▼
//!   ┌───────────────────────── lifecycle ─────────────────────────┐
//!   │ bootstrap ──▶ create channels ──▶ join channels ──▶ deploy  │
//!   └──────────────────────────────┬──────────────────────────────┘
//!                                  ▼
//!                  transaction: propose → endorse → order → commit
//!                                  │
//!                                  ▼
//!                 ledger collaborators (simulated in-process network)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ledger_orchestrator::config::load_config;
use ledger_orchestrator::lifecycle::{run_transfer, LedgerNetwork, TransferScenario};
use ledger_orchestrator::observability::{logging, metrics};
use ledger_orchestrator::{NetworkConfig, OrchestratorResult, SimNetwork, TransactionRequest};

#[derive(Parser)]
#[command(name = "ledger-orchestrator")]
#[command(about = "Bootstrap a multi-organization ledger network and run transactions", long_about = None)]
struct Cli {
    /// Network description file
    #[arg(short, long, default_value = "network.toml")]
    config: PathBuf,

    /// Log level, overriding the config file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration only
    Validate,
    /// Bring the whole network up
    Run {
        /// Run the balance-transfer check afterwards
        #[arg(long)]
        scenario: bool,
    },
    /// Bring the network up, then evaluate one query
    Query(TransactionArgs),
    /// Bring the network up, then submit one invoke
    Invoke(TransactionArgs),
}

#[derive(clap::Args)]
struct TransactionArgs {
    #[arg(long, default_value = "mychannel")]
    channel: String,

    #[arg(long, default_value = "org0")]
    organization: String,

    #[arg(long, default_value = "User1")]
    user: String,

    /// Chaincode function followed by its arguments
    #[arg(required = true, num_args = 1..)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let level = cli.log_level.clone().unwrap_or_else(|| match &loaded {
        Ok(config) => config.observability.log_level.clone(),
        Err(_) => "info".to_string(),
    });
    logging::init_logging(&level);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %cli.config.display(),
        organizations = config.organizations.len(),
        channels = config.channels.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), indeterminate = e.is_indeterminate(), "Orchestration failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: NetworkConfig) -> OrchestratorResult<()> {
    if let Commands::Validate = command {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    let connector = SimNetwork::new();
    let network = LedgerNetwork::new(config, &connector)?;
    network.start().await?;

    match command {
        Commands::Validate => {}
        Commands::Run { scenario } => {
            if scenario {
                for (channel, organization) in scenario_targets(&network) {
                    let report = run_transfer(&network, &TransferScenario::balance_transfer(&channel, &organization)).await?;
                    println!(
                        "{channel}: alice {} -> {}, bob {} -> {} (tx {})",
                        report.from_before, report.from_after, report.to_before, report.to_after, report.tx_id
                    );
                }
            }
        }
        Commands::Query(args) => {
            let request = TransactionRequest::query(&args.channel, &args.organization, &args.user, &as_strs(&args.args));
            let payload = network.query_transaction(&request).await?;
            println!("{payload}");
        }
        Commands::Invoke(args) => {
            let request = TransactionRequest::invoke(&args.channel, &args.organization, &args.user, &as_strs(&args.args));
            let outcome = network.submit_transaction(&request).await?;
            let block = outcome.commit.map(|c| c.block_number).unwrap_or_default();
            println!("{} committed in block {}", outcome.tx_id, block);
        }
    }
    Ok(())
}

/// First member organization of every channel with a chaincode.
fn scenario_targets(network: &LedgerNetwork) -> Vec<(String, String)> {
    let config = network.config();
    config
        .channels
        .iter()
        .filter(|(_, channel)| channel.chaincode.is_some())
        .filter_map(|(name, channel)| {
            channel
                .peer_organizations
                .keys()
                .next()
                .map(|org| (name.clone(), org.clone()))
        })
        .collect()
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
