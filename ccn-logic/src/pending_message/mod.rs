//! Pending-Message Processor pipeline (spec §4.4), the core that drains
//! `pending_messages` into persisted, validated state. Mirrors the teacher's
//! `Indexer::start`, which fans a stream of jobs out across bounded workers
//! and commits each job's result in its own transaction; here a job is one
//! `pending_messages` row and the "job kind" is its `MessageType`.

pub mod settings;

#[cfg(test)]
mod db_tests;

use std::{collections::HashSet, sync::Arc, time::Duration};

use ccn_entity::{
    message_status, messages, pending_messages, rejected_messages,
    sea_orm_active_enums::{ErrorCode as EntityErrorCode, MessageStatus as MessageStatusKind, MessageType},
};
use chrono::Utc;
use futures::StreamExt;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::{
    broker::{self, BrokerClient},
    content::MessageContent,
    crypto,
    errors::{ErrorCode, ProcessError},
    handlers::{self, PendingContext},
    scheduler::{self, LogicalKey, RetrySettings, SeenIdsWindow},
    storage::{FetchResult, StorageService},
};

pub use settings::PendingMessagesSettings;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// What `run()` decided to do with one row, surfaced for the caller to ack or
/// nack the originating broker delivery (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    Rejected,
    RetryLater,
}

pub struct PendingMessageProcessor {
    db: DatabaseConnection,
    storage: StorageService,
    retry: RetrySettings,
    semaphores: std::collections::HashMap<MessageType, Arc<Semaphore>>,
    processing: Mutex<HashSet<LogicalKey>>,
    /// Recency window for the scan loop (spec §4.6): a logical key the
    /// broker-driven path just dispatched is marked here so the periodic
    /// scan doesn't redundantly redispatch it moments later.
    seen_ids: SeenIdsWindow,
}

impl PendingMessageProcessor {
    pub fn new(
        db: DatabaseConnection,
        storage: StorageService,
        retry: RetrySettings,
        pipeline: &PendingMessagesSettings,
    ) -> Self {
        use sea_orm::Iterable;

        let semaphores = MessageType::iter()
            .map(|message_type| {
                let permits = pipeline.permits_for(&message_type) as usize;
                (message_type, Arc::new(Semaphore::new(permits.max(1))))
            })
            .collect();

        Self {
            db,
            storage,
            seen_ids: SeenIdsWindow::new(retry.seen_ids_capacity),
            retry,
            semaphores,
            processing: Mutex::new(HashSet::new()),
        }
    }

    /// Drives both the broker-fed and periodic-scan inputs (spec §4.4
    /// "Inputs") until `shutdown` is cancelled.
    pub async fn run(
        self: Arc<Self>,
        broker: Arc<BrokerClient>,
        pipeline: PendingMessagesSettings,
        shutdown: CancellationToken,
    ) -> Result<(), lapin::Error> {
        let consumer = {
            let this = self.clone();
            let broker = broker.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.run_broker_consumer(&broker, shutdown).await })
        };
        let scanner = {
            let this = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.run_scan_loop(pipeline, shutdown).await })
        };

        let consumer_result = consumer.await.unwrap_or(Ok(()));
        let _ = scanner.await;
        consumer_result
    }

    async fn run_broker_consumer(
        &self,
        broker: &BrokerClient,
        shutdown: CancellationToken,
    ) -> Result<(), lapin::Error> {
        let mut deliveries = broker
            .consume(broker::PENDING_MESSAGE_QUEUE, "pending-message-processor")
            .await?;

        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = deliveries.next() => match next {
                    Some(delivery) => delivery?,
                    None => return Ok(()),
                },
            };

            let Some(item_hash) = parse_notification(delivery.data()) else {
                tracing::warn!("dropping malformed pending-message notification");
                delivery.nack().await?;
                continue;
            };

            match self.process_by_item_hash(&item_hash).await {
                Ok(_) => delivery.ack().await?,
                Err(err) => {
                    tracing::error!(item_hash, error = %err, "failed to process pending message");
                    delivery.nack().await?;
                }
            }
        }
    }

    /// Periodic fallback for messages that never arrived over the broker
    /// (or whose `next_attempt` backoff has since elapsed), ordered by
    /// `(retries ASC, time ASC)` per spec §4.4 "Inputs".
    async fn run_scan_loop(&self, pipeline: PendingMessagesSettings, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(pipeline.scan_interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = interval.tick() => {}
            }

            match scheduler::sweep_duplicates(&self.db, self.retry.high_water_mark).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "swept stale duplicate pending messages"),
                Err(err) => tracing::error!(error = %err, "duplicate sweep failed"),
            }

            let now = Utc::now();
            let due = match pending_messages::Entity::find()
                .filter(pending_messages::Column::NextAttempt.lte(now))
                .order_by_asc(pending_messages::Column::Retries)
                .order_by_asc(pending_messages::Column::Time)
                .limit(pipeline.scan_batch_size)
                .all(&self.db)
                .await
            {
                Ok(rows) => rows,
                Err(err) => {
                    tracing::error!(error = %err, "pending-message scan query failed");
                    continue;
                }
            };

            for row in due {
                let key = LogicalKey::from_pending(&row);
                if self.seen_ids.seen_or_insert(key).await {
                    continue;
                }
                if let Err(err) = self.process_one(row.id).await {
                    tracing::error!(id = row.id, error = %err, "scan-loop processing failed");
                }
            }
        }
    }

    async fn process_by_item_hash(&self, item_hash: &str) -> Result<Option<Outcome>, ProcessError> {
        let Some(row) = pending_messages::Entity::find()
            .filter(pending_messages::Column::ItemHash.eq(item_hash))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        self.seen_ids.seen_or_insert(LogicalKey::from_pending(&row)).await;
        self.process_one(row.id).await
    }

    /// Entry point for one `pending_messages.id`: acquires the in-flight
    /// guard and the per-type semaphore, then runs the algorithm.
    pub async fn process_one(&self, id: i64) -> Result<Option<Outcome>, ProcessError> {
        let Some(row) = pending_messages::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let key = scheduler::LogicalKey::from_pending(&row);
        {
            let mut processing = self.processing.lock().await;
            if !processing.insert(key.clone()) {
                return Ok(None);
            }
        }

        let permit_type = row.r#type.clone();
        let semaphore = self
            .semaphores
            .get(&permit_type)
            .cloned()
            .expect("a semaphore is registered for every MessageType variant");
        let _permit = semaphore.acquire().await.expect("semaphore never closed");

        let outcome = self.process_row(row).await;

        self.processing.lock().await.remove(&key);
        outcome.map(Some)
    }

    async fn process_row(&self, row: pending_messages::Model) -> Result<Outcome, ProcessError> {
        let item_content = match self.ensure_fetched(&row).await {
            Ok(content) => content,
            Err(Outcome::Rejected) => return Ok(self.reject_row(&row, ErrorCode::ContentHashMismatch, "content hash mismatch", None).await?),
            Err(Outcome::RetryLater) => return Ok(self.reschedule_row(&row, "content unavailable").await?),
            Err(Outcome::Committed) => unreachable!("ensure_fetched never returns Committed as an error"),
        };

        if row.check_message {
            if let Err(err) = self.verify_signature(&row, &item_content) {
                return Ok(self
                    .reject_row(&row, ErrorCode::InvalidSignature, &err.to_string(), None)
                    .await?);
            }
        }

        let content_value: serde_json::Value = match serde_json::from_str(&item_content) {
            Ok(value) => value,
            Err(err) => {
                return Ok(self
                    .reject_row(&row, ErrorCode::ContentValidationFailed, &err.to_string(), None)
                    .await?)
            }
        };

        if let Err(err) = MessageContent::parse(&row.r#type, &content_value) {
            return Ok(self
                .reject_row(&row, ErrorCode::ContentValidationFailed, &err.to_string(), None)
                .await?);
        }

        let ctx = PendingContext {
            item_hash: row.item_hash.clone(),
            sender: row.sender.clone(),
            chain: row.chain.clone(),
            message_type: row.r#type.clone(),
            signature: row.signature.clone(),
            item_type: row.item_type.clone(),
            item_content: item_content.clone(),
            time: row.time.with_timezone(&Utc),
            channel: row.channel.clone(),
        };

        let txn = self.db.begin().await?;
        let handler = handlers::handler_for(&row.r#type);
        match handlers::run_handler(handler.as_ref(), &txn, &ctx, &content_value).await {
            Ok(()) => {
                self.commit(&txn, &row, &ctx, &content_value).await?;
                txn.commit().await?;
                Ok(Outcome::Committed)
            }
            Err(ProcessError::Rejected { code, message, details }) => {
                txn.rollback().await?;
                self.reject_row(&row, code, &message, details).await
            }
            Err(ProcessError::RetryLater(reason)) => {
                txn.rollback().await?;
                self.reschedule_row(&row, &reason).await
            }
            Err(ProcessError::Db(err)) => {
                txn.rollback().await?;
                Err(ProcessError::Db(err))
            }
        }
    }

    /// Resolves `item_content` if not already fetched, verifying the
    /// `sha256(item_content) == item_hash` binding (spec §4.4 step 2, I4).
    async fn ensure_fetched(&self, row: &pending_messages::Model) -> Result<String, Outcome> {
        if row.fetched {
            return Ok(row
                .item_content
                .clone()
                .expect("fetched=true implies item_content is present (I4)"));
        }

        use ccn_entity::sea_orm_active_enums::ItemType;
        let bytes = match row.item_type {
            ItemType::Inline => row
                .item_content
                .clone()
                .map(|s| s.into_bytes())
                .ok_or(Outcome::Rejected)?,
            ItemType::Storage | ItemType::Ipfs => {
                match self.storage.get_raw(&row.item_hash, FETCH_TIMEOUT).await {
                    FetchResult::Found(bytes) => bytes,
                    FetchResult::Invalid => return Err(Outcome::Rejected),
                    FetchResult::Unavailable => return Err(Outcome::RetryLater),
                }
            }
        };

        let computed = hex::encode(Sha256::digest(&bytes));
        if computed != row.item_hash {
            return Err(Outcome::Rejected);
        }

        let content = String::from_utf8(bytes).map_err(|_| Outcome::Rejected)?;

        let mut active: pending_messages::ActiveModel = row.clone().into();
        active.fetched = Set(true);
        active.item_content = Set(Some(content.clone()));
        if let Err(err) = active.update(&self.db).await {
            tracing::error!(item_hash = %row.item_hash, error = %err, "failed to persist fetched content");
        }

        Ok(content)
    }

    fn verify_signature(
        &self,
        row: &pending_messages::Model,
        item_content: &str,
    ) -> Result<(), crate::errors::VerifyError> {
        use crate::errors::VerifyError;
        let signature = row.signature.as_deref().ok_or(VerifyError::MalformedSignature(
            "check_message is set but no signature was provided".to_string(),
        ))?;
        let scheme = crypto::scheme_for(&row.chain)?;
        scheme.verify(item_content.as_bytes(), signature, &row.sender)
    }

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        row: &pending_messages::Model,
        ctx: &PendingContext,
        content_value: &serde_json::Value,
    ) -> Result<(), ProcessError> {
        messages::ActiveModel {
            item_hash: Set(ctx.item_hash.clone()),
            r#type: Set(ctx.message_type.clone()),
            chain: Set(ctx.chain.clone()),
            sender: Set(ctx.sender.clone()),
            signature: Set(ctx.signature.clone()),
            item_type: Set(ctx.item_type.clone()),
            item_content: Set(Some(ctx.item_content.clone())),
            content: Set(content_value.clone()),
            time: Set(row.time),
            channel: Set(ctx.channel.clone()),
            size: Set(handlers::canonical_size(ctx)),
        }
        .insert(txn)
        .await?;

        upsert_status(txn, &ctx.item_hash, MessageStatusKind::Processed).await?;

        pending_messages::Entity::delete_by_id(row.id).exec(txn).await?;
        Ok(())
    }

    async fn reject_row(
        &self,
        row: &pending_messages::Model,
        code: ErrorCode,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<Outcome, ProcessError> {
        let txn = self.db.begin().await?;

        rejected_messages::Entity::insert(rejected_messages::ActiveModel {
            item_hash: Set(row.item_hash.clone()),
            message: Set(candidate_json(row)),
            error_code: Set(EntityErrorCode::from(code)),
            details: Set(details.or_else(|| Some(serde_json::json!({"reason": message})))),
            traceback: Set(None),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(rejected_messages::Column::ItemHash)
                .do_nothing()
                .to_owned(),
        )
        .on_empty_do_nothing()
        .exec(&txn)
        .await?;

        upsert_status(&txn, &row.item_hash, MessageStatusKind::Rejected).await?;
        pending_messages::Entity::delete_by_id(row.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(Outcome::Rejected)
    }

    /// Backoff the row, or give up with `EXCEEDED_AMT_OF_RETRIES` once
    /// `max_retries` is hit (spec §4.4 step 8).
    async fn reschedule_row(&self, row: &pending_messages::Model, reason: &str) -> Result<Outcome, ProcessError> {
        let next_retries = row.retries + 1;
        if next_retries > self.retry.max_retries {
            return self
                .reject_row(row, ErrorCode::ExceededAmtOfRetries, reason, None)
                .await;
        }

        let delay = scheduler::backoff(&self.retry, next_retries);
        let mut active: pending_messages::ActiveModel = row.clone().into();
        active.retries = Set(next_retries);
        active.next_attempt = Set((Utc::now() + delay).into());
        active.update(&self.db).await?;

        Ok(Outcome::RetryLater)
    }
}

async fn upsert_status<C: sea_orm::ConnectionTrait>(
    db: &C,
    item_hash: &str,
    status: MessageStatusKind,
) -> Result<(), sea_orm::DbErr> {
    message_status::Entity::insert(message_status::ActiveModel {
        item_hash: Set(item_hash.to_string()),
        status: Set(status),
        reception_time: Set(Utc::now().into()),
    })
    .on_conflict(
        sea_orm::sea_query::OnConflict::column(message_status::Column::ItemHash)
            .update_column(message_status::Column::Status)
            .to_owned(),
    )
    .exec(db)
    .await?;
    Ok(())
}

fn candidate_json(row: &pending_messages::Model) -> serde_json::Value {
    serde_json::json!({
        "item_hash": row.item_hash,
        "sender": row.sender,
        "chain": format!("{:?}", row.chain),
        "type": format!("{:?}", row.r#type),
        "item_type": format!("{:?}", row.item_type),
        "time": row.time,
        "channel": row.channel,
    })
}

fn parse_notification(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("item_hash")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notification_body() {
        let body = br#"{"item_hash":"abc123"}"#;
        assert_eq!(parse_notification(body), Some("abc123".to_string()));
    }

    #[test]
    fn rejects_malformed_notification() {
        assert_eq!(parse_notification(b"not json"), None);
        assert_eq!(parse_notification(br#"{"other":"field"}"#), None);
    }
}
