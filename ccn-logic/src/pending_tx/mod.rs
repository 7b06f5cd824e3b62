//! Pending-Tx Processor (spec §4.2), grounded on `process_pending_txs.py`.
//! Consumes the `pending-tx-queue`, expands each `ChainTx` via the Chain
//! Data Service, and feeds every candidate to the Message Publisher.

pub mod settings;

#[cfg(test)]
mod db_tests;

use std::{num::NonZeroUsize, sync::Arc};

use ccn_entity::{
    chain_txs, pending_txs,
    sea_orm_active_enums::{ChainSyncProtocol, MessageOrigin},
};
use chrono::Utc;
use futures::StreamExt;
use lru::LruCache;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use tokio_util::sync::CancellationToken;

use crate::{
    broker::{self, BrokerClient},
    chain_data::ChainDataService,
    errors::PendingTxError,
    publisher::MessagePublisher,
};

pub use settings::PendingTxSettings;

pub struct PendingTxProcessor {
    db: DatabaseConnection,
    chain_data: ChainDataService,
    publisher: MessagePublisher,
    seen_ids_capacity: usize,
}

impl PendingTxProcessor {
    pub fn new(
        db: DatabaseConnection,
        chain_data: ChainDataService,
        publisher: MessagePublisher,
        seen_ids_capacity: usize,
    ) -> Self {
        Self {
            db,
            chain_data,
            publisher,
            seen_ids_capacity,
        }
    }

    /// Runs `settings.concurrency` consumers against `pending-tx-queue`
    /// until `shutdown` is cancelled. Each consumer owns its own bounded
    /// `seen_ids` window (spec §5 "Shared resources": per-worker, never
    /// shared).
    pub async fn run(
        self: Arc<Self>,
        broker: Arc<BrokerClient>,
        settings: PendingTxSettings,
        shutdown: CancellationToken,
    ) -> Result<(), lapin::Error> {
        let mut workers = Vec::new();
        for worker_id in 0..settings.concurrency.max(1) {
            let this = self.clone();
            let broker = broker.clone();
            let shutdown = shutdown.clone();
            workers.push(tokio::spawn(async move {
                if let Err(err) = this.run_one_consumer(&broker, worker_id, shutdown).await {
                    tracing::error!(worker_id, error = %err, "pending-tx consumer exited");
                }
            }));
        }
        for worker in workers {
            let _ = worker.await;
        }
        Ok(())
    }

    async fn run_one_consumer(
        &self,
        broker: &BrokerClient,
        worker_id: u32,
        shutdown: CancellationToken,
    ) -> Result<(), lapin::Error> {
        let mut seen_ids = LruCache::new(
            NonZeroUsize::new(self.seen_ids_capacity.max(1)).expect("capacity clamped to at least 1"),
        );
        let consumer_tag = format!("pending-tx-worker-{worker_id}");
        let mut deliveries = broker
            .consume(broker::PENDING_TX_QUEUE, &consumer_tag)
            .await?;

        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(worker_id, "pending-tx consumer cancelled");
                    return Ok(());
                }
                next = deliveries.next() => match next {
                    Some(delivery) => delivery?,
                    None => return Ok(()),
                },
            };

            let tx_hash = match std::str::from_utf8(delivery.data()) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    tracing::warn!(worker_id, "dropping non-utf8 pending-tx delivery");
                    delivery.nack().await?;
                    continue;
                }
            };

            match self.handle_pending_tx(&tx_hash, &mut seen_ids).await {
                Ok(true) => delivery.ack().await?,
                Ok(false) => delivery.nack().await?,
                Err(err) => {
                    tracing::error!(worker_id, tx_hash, error = %err, "failed to handle pending tx");
                    delivery.nack().await?;
                }
            }
        }
    }

    /// Handles one `tx_hash` pulled off the broker. Returns `true` when the
    /// caller should ack and the `PendingTx` row was deleted, `false` when
    /// the content was unavailable and redelivery should retry (spec §4.2
    /// steps 4-5).
    pub async fn handle_pending_tx(
        &self,
        tx_hash: &str,
        seen_ids: &mut LruCache<String, ()>,
    ) -> Result<bool, PendingTxError> {
        let Some(pending) = pending_txs::Entity::find_by_id(tx_hash.to_string())
            .one(&self.db)
            .await?
        else {
            tracing::info!(tx_hash, "no pending_tx row, already handled");
            return Ok(true);
        };

        let Some(tx) = chain_txs::Entity::find_by_id(pending.tx_hash.clone())
            .one(&self.db)
            .await?
        else {
            tracing::warn!(tx_hash, "pending_tx has no matching chain_tx, dropping");
            pending_txs::Entity::delete_by_id(tx_hash.to_string())
                .exec(&self.db)
                .await?;
            return Ok(true);
        };

        let candidates = self
            .chain_data
            .get_tx_messages(&self.db, &tx, Some(seen_ids))
            .await?;

        let check_message = tx.protocol != ChainSyncProtocol::SmartContract;
        let reception_time = Utc::now();
        for candidate in &candidates {
            self.publisher
                .add_pending_message(
                    candidate,
                    reception_time,
                    MessageOrigin::OnChain,
                    Some(&tx.hash),
                    check_message,
                    Some(tx.chain.clone()),
                    Some(tx.height),
                )
                .await?;
        }

        let txn = self.db.begin().await?;
        pending_txs::Entity::delete_by_id(tx_hash.to_string())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(true)
    }
}
