//! `post`: store the post, or treat it as an amendment if `ref` cites an
//! existing item and the sender matches (spec §4.5).

use async_trait::async_trait;
use ccn_entity::messages;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use serde_json::Value;

use super::{PendingContext, TypeHandler};
use crate::{
    content::{MessageContent, PostContent},
    errors::{ErrorCode, ProcessError},
};

pub struct PostHandler;

#[async_trait]
impl TypeHandler for PostHandler {
    async fn validate(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        let post: PostContent = match MessageContent::parse(
            &ccn_entity::sea_orm_active_enums::MessageType::Post,
            content,
        )? {
            MessageContent::Post(post) => post,
            _ => unreachable!("dispatched as post"),
        };

        let Some(reference) = &post.reference else {
            return Ok(());
        };

        let original = messages::Entity::find()
            .filter(messages::Column::ItemHash.eq(reference))
            .one(txn)
            .await?;
        match original {
            Some(original) if original.sender == ctx.sender => Ok(()),
            Some(_) => Err(ProcessError::rejected(
                ErrorCode::PermissionDenied,
                format!("post {} is not authored by {}", reference, ctx.sender),
            )),
            None => {
                // The referenced post hasn't been seen yet; this is not a
                // permanent failure, it may simply not have arrived yet.
                Err(ProcessError::RetryLater(format!(
                    "amended post {reference} not yet known"
                )))
            }
        }
    }

    async fn commit(
        &self,
        _txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        _content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
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
