//! `aggregate`: upsert `(owner, key)`'s merged element, last-writer-wins by
//! `time`, ties broken by `item_hash` (spec §4.5).

use async_trait::async_trait;
use ccn_entity::aggregates;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use serde_json::Value;

use super::{PendingContext, TypeHandler};
use crate::{
    content::{AggregateContent, MessageContent},
    errors::ProcessError,
};

pub struct AggregateHandler;

#[async_trait]
impl TypeHandler for AggregateHandler {
    async fn validate(
        &self,
        _txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        MessageContent::parse(&ccn_entity::sea_orm_active_enums::MessageType::Aggregate, content)?;
        Ok(())
    }

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        let amend: AggregateContent = match MessageContent::parse(
            &ccn_entity::sea_orm_active_enums::MessageType::Aggregate,
            content,
        )? {
            MessageContent::Aggregate(amend) => amend,
            _ => unreachable!("dispatched as aggregate"),
        };

        let existing = aggregates::Entity::find_by_id((amend.address.clone(), amend.key.clone()))
            .one(txn)
            .await?;

        let wins = match &existing {
            None => true,
            Some(row) => match amend.time.partial_cmp(&row.time) {
                Some(std::cmp::Ordering::Greater) => true,
                Some(std::cmp::Ordering::Equal) => ctx.item_hash > row.item_hash,
                _ => false,
            },
        };

        if !wins {
            return Ok(());
        }

        let model = aggregates::ActiveModel {
            owner: Set(amend.address),
            key: Set(amend.key),
            item_hash: Set(ctx.item_hash.clone()),
            time: Set(amend.time),
            content: Set(amend.content),
        };

        if existing.is_some() {
            model.update(txn).await?;
        } else {
            model.insert(txn).await?;
        }

        Ok(())
    }

    async fn forget(
        &self,
        _txn: &DatabaseTransaction,
        _item_hash: &str,
    ) -> Result<(), ProcessError> {
        Ok(())
    }
}
