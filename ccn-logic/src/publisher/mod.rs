//! Message Publisher / admission gate (spec §4.3), the single front door
//! both the Pending-Tx Processor and the pub/sub ingest path call before a
//! message becomes a `pending_messages` row.

pub mod candidate;

use ccn_entity::{
    message_confirmations, message_status, pending_messages,
    sea_orm_active_enums::{Chain, MessageOrigin, MessageStatus as MessageStatusKind},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use sha2::{Digest, Sha256};

use crate::{
    broker::BrokerClient,
    errors::{ErrorCode, PublishError},
};

use self::candidate::Candidate;

/// sha256 of the logical key `(item_hash, sender, source_chain, source_height)`.
/// Used as the idempotent-upsert conflict target because the logical key
/// itself has nullable components and can't be a SQL unique constraint as-is.
pub fn logical_key_dedup_hash(
    item_hash: &str,
    sender: &str,
    source_chain: Option<Chain>,
    source_height: Option<i64>,
) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(item_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(sender.as_bytes());
    hasher.update(b"|");
    hasher.update(
        source_chain
            .map(|c| format!("{c:?}"))
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(
        source_height
            .map(|h| h.to_string())
            .unwrap_or_default()
            .as_bytes(),
    );
    hasher.finalize().to_vec()
}

pub struct MessagePublisher {
    db: DatabaseConnection,
    broker: Option<BrokerClient>,
}

impl MessagePublisher {
    pub fn new(db: DatabaseConnection, broker: Option<BrokerClient>) -> Self {
        Self { db, broker }
    }

    /// Exactly spec §4.3: filter to authorized fields, validate
    /// well-formedness, compute the logical key, idempotently upsert, ensure
    /// a `message_status` row exists, record a tx confirmation if `tx_hash`
    /// is given, then publish a broker event for eager pickup.
    ///
    /// A malformed candidate is recorded as a `rejected_messages` row (when
    /// it carries enough of an `item_hash` to key one) and this returns
    /// `Ok(None)` rather than an error — admission failures are not
    /// exceptional, they're one of the two expected outcomes.
    pub async fn add_pending_message(
        &self,
        message_dict: &serde_json::Value,
        reception_time: DateTime<Utc>,
        origin: MessageOrigin,
        tx_hash: Option<&str>,
        check_message: bool,
        source_chain: Option<Chain>,
        source_height: Option<i64>,
    ) -> Result<Option<pending_messages::Model>, PublishError> {
        let candidate = match Candidate::parse(message_dict) {
            Ok(candidate) => candidate,
            Err(err) => {
                self.reject(message_dict, &err.to_string()).await?;
                return Ok(None);
            }
        };

        let dedup_key = logical_key_dedup_hash(
            &candidate.item_hash,
            &candidate.sender,
            source_chain.clone(),
            source_height,
        );

        let txn = self.db.begin().await?;

        let active = pending_messages::ActiveModel {
            item_hash: Set(candidate.item_hash.clone()),
            sender: Set(candidate.sender.clone()),
            chain: Set(candidate.chain),
            r#type: Set(candidate.message_type),
            signature: Set(candidate.signature),
            item_type: Set(candidate.item_type),
            item_content: Set(candidate.item_content),
            time: Set(candidate.time.into()),
            channel: Set(candidate.channel),
            reception_time: Set(reception_time.into()),
            retries: Set(0),
            next_attempt: Set(reception_time.into()),
            fetched: Set(false),
            check_message: Set(check_message),
            origin: Set(origin),
            source_chain: Set(source_chain),
            source_height: Set(source_height),
            source_tx_hash: Set(tx_hash.map(ToString::to_string)),
            dedup_key: Set(dedup_key.clone()),
            ..Default::default()
        };
        pending_messages::Entity::insert(active)
            .on_conflict(
                OnConflict::column(pending_messages::Column::DedupKey)
                    .do_nothing()
                    .to_owned(),
            )
            .on_empty_do_nothing()
            .exec(&txn)
            .await?;

        let row = pending_messages::Entity::find()
            .filter(pending_messages::Column::DedupKey.eq(dedup_key))
            .one(&txn)
            .await?
            .expect("row was just inserted or already existed under this dedup_key");

        message_status::Entity::insert(message_status::ActiveModel {
            item_hash: Set(candidate.item_hash.clone()),
            status: Set(MessageStatusKind::Pending),
            reception_time: Set(reception_time.into()),
        })
        .on_conflict(
            OnConflict::column(message_status::Column::ItemHash)
                .do_nothing()
                .to_owned(),
        )
        .on_empty_do_nothing()
        .exec(&txn)
        .await?;

        if let Some(tx_hash) = tx_hash {
            let existing = message_confirmations::Entity::find()
                .filter(message_confirmations::Column::ItemHash.eq(candidate.item_hash.clone()))
                .filter(message_confirmations::Column::TxHash.eq(tx_hash))
                .one(&txn)
                .await?;
            if existing.is_none() {
                message_confirmations::ActiveModel {
                    item_hash: Set(candidate.item_hash.clone()),
                    tx_hash: Set(tx_hash.to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;

        if let Some(broker) = &self.broker {
            let event = serde_json::json!({"item_hash": candidate.item_hash});
            if let Err(err) = broker
                .publish_pending_message(&serde_json::to_vec(&event).expect("json serializes"))
                .await
            {
                tracing::warn!(error = %err, item_hash = %candidate.item_hash, "failed to publish pending-message event, periodic scan will pick it up");
            }
        }

        Ok(Some(row))
    }

    async fn reject(
        &self,
        message_dict: &serde_json::Value,
        reason: &str,
    ) -> Result<(), PublishError> {
        let Some(item_hash) = message_dict.get("item_hash").and_then(|v| v.as_str()) else {
            tracing::warn!(reason, "dropping malformed candidate with no item_hash to key a rejection on");
            return Ok(());
        };

        ccn_entity::rejected_messages::Entity::insert(
            ccn_entity::rejected_messages::ActiveModel {
                item_hash: Set(item_hash.to_string()),
                message: Set(message_dict.clone()),
                error_code: Set(ErrorCode::InvalidFormat.into()),
                details: Set(Some(serde_json::json!({"reason": reason}))),
                traceback: Set(None),
            },
        )
        .on_conflict(
            OnConflict::column(ccn_entity::rejected_messages::Column::ItemHash)
                .do_nothing()
                .to_owned(),
        )
        .on_empty_do_nothing()
        .exec(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_hash_differs_by_source_height() {
        let a = logical_key_dedup_hash("hash", "sender", Some(Chain::Ethereum), Some(1));
        let b = logical_key_dedup_hash("hash", "sender", Some(Chain::Ethereum), Some(2));
        assert_ne!(a, b);
    }

    #[test]
    fn dedup_hash_is_stable_for_the_same_inputs() {
        let a = logical_key_dedup_hash("hash", "sender", None, None);
        let b = logical_key_dedup_hash("hash", "sender", None, None);
        assert_eq!(a, b);
    }
}
