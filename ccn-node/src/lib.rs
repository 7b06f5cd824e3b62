mod server;
mod settings;

pub use server::run as run_api;
pub use settings::Settings;

use std::sync::Arc;

use anyhow::Context;
use blockscout_service_launcher::database;
use ccn_logic::{
    broker::BrokerClient,
    chain_data::ChainDataService,
    pending_message::PendingMessageProcessor,
    pending_tx::PendingTxProcessor,
    publisher::MessagePublisher,
    storage::{FilesystemEngine, StorageService},
};
use migration::Migrator;
use tokio_util::sync::CancellationToken;

const SERVICE_NAME: &str = "ccn_node";

pub fn init_logs(settings: &Settings) -> anyhow::Result<()> {
    blockscout_service_launcher::tracing::init_logs(SERVICE_NAME, &settings.tracing, &settings.jaeger)
}

async fn connect_db(settings: &Settings) -> anyhow::Result<sea_orm::DatabaseConnection> {
    database::initialize_postgres::<Migrator>(&settings.database)
        .await
        .context("database initialization failed")
}

fn build_storage(settings: &Settings) -> StorageService {
    let engine = Arc::new(FilesystemEngine::new(settings.storage.folder.clone()));
    StorageService::new(engine, &settings.storage)
}

/// Reads the node's identity key (spec.md §6 "Process CLI surface" `--key`).
/// Opaque bytes for now: nothing in this core signs outgoing traffic with it
/// yet, but every subprocess loads and validates it at bootstrap so a bad
/// path fails fast rather than surfacing later as a silent no-op.
pub fn load_node_key(path: &std::path::Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read node key at {}", path.display()))
}

/// `sync-txs` subcommand: runs the Pending-Tx Processor, draining
/// `pending-tx-queue` and expanding each `ChainTx` via the Chain Data
/// Service into `pending_messages` rows.
pub async fn run_sync_txs(settings: Settings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let db = connect_db(&settings).await?;
    let storage = build_storage(&settings);
    let broker = BrokerClient::connect(settings.broker.clone())
        .await
        .context("failed to connect to broker")?;
    broker
        .declare_pending_tx_topology()
        .await
        .context("failed to declare pending-tx broker topology")?;

    let chain_data = ChainDataService::new(storage);
    let publisher = MessagePublisher::new(db.clone(), Some(broker.clone()));
    let processor = Arc::new(PendingTxProcessor::new(
        db,
        chain_data,
        publisher,
        settings.retry.seen_ids_capacity,
    ));

    processor
        .run(Arc::new(broker), settings.pending_txs, shutdown)
        .await
        .context("pending-tx processor exited with an error")
}

/// `process-messages` subcommand: runs the Pending-Message Processor
/// pipeline (spec §4.4), draining `pending-message-queue` plus the periodic
/// scan over `pending_messages`.
pub async fn run_process_messages(settings: Settings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let db = connect_db(&settings).await?;
    let storage = build_storage(&settings);
    let broker = BrokerClient::connect(settings.broker.clone())
        .await
        .context("failed to connect to broker")?;
    broker
        .declare_pending_message_topology()
        .await
        .context("failed to declare pending-message broker topology")?;

    let processor = Arc::new(PendingMessageProcessor::new(
        db,
        storage,
        settings.retry,
        &settings.pending_messages,
    ));

    processor
        .run(Arc::new(broker), settings.pending_messages.clone(), shutdown)
        .await
        .context("pending-message processor exited with an error")
}
