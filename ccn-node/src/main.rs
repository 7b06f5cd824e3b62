use std::path::PathBuf;

use anyhow::Context;
use blockscout_service_launcher::launcher::ConfigSettings;
use ccn_node::{init_logs, load_node_key, run_api, run_process_messages, run_sync_txs, Settings};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// Core Channel Node: message ingestion and chain-sync core (spec.md §6
/// "Process CLI surface"). One subcommand per subprocess; ingestion,
/// admission and processing run as independent OS processes sharing only
/// the database and broker.
#[derive(Parser)]
#[command(name = "ccn-node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand confirmed chain transactions into pending messages.
    SyncTxs {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        key: Option<PathBuf>,
    },
    /// Drive the pending-message pipeline to completion.
    ProcessMessages {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        key: Option<PathBuf>,
    },
    /// Minimal health-only HTTP surface.
    Api {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        key: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, key) = match &cli.command {
        Commands::SyncTxs { config, key }
        | Commands::ProcessMessages { config, key }
        | Commands::Api { config, key } => (config.clone(), key.clone()),
    };

    std::env::set_var("CCN_NODE__CONFIG", &config);
    let settings = Settings::build().context("failed to read config")?;
    init_logs(&settings)?;

    if let Some(key_path) = key {
        let node_key = load_node_key(&key_path)?;
        tracing::info!(bytes = node_key.len(), "loaded node identity key");
    }

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            shutdown_signal.cancel();
        }
    });

    match cli.command {
        Commands::SyncTxs { .. } => run_sync_txs(settings, shutdown).await,
        Commands::ProcessMessages { .. } => run_process_messages(settings, shutdown).await,
        Commands::Api { .. } => run_api(settings).await,
    }
}
