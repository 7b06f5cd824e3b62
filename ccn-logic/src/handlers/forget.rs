//! `forget`: for each target in `hashes`, if the sender is authorized (the
//! original owner), transition the target to `forgotten`: delete its
//! `messages` row, insert a `forgotten_messages` tombstone carrying
//! `forgotten_by = [forget.item_hash]`. Forgetting a `forget` is disallowed
//! (spec §4.5).

use async_trait::async_trait;
use ccn_entity::{
    forgotten_messages, message_status, messages,
    sea_orm_active_enums::{MessageStatus as MessageStatusKind, MessageType},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseTransaction, EntityTrait};
use serde_json::Value;

use super::{handler_for, PendingContext, TypeHandler};
use crate::{
    content::{ForgetContent, MessageContent},
    errors::{ErrorCode, ProcessError},
};

pub struct ForgetHandler;

#[async_trait]
impl TypeHandler for ForgetHandler {
    async fn validate(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        let forget = parse(content)?;

        for hash in &forget.hashes {
            let Some(target) = messages::Entity::find_by_id(hash.clone()).one(txn).await? else {
                continue;
            };
            if target.r#type == MessageType::Forget {
                return Err(ProcessError::rejected(
                    ErrorCode::PermissionDenied,
                    "forgetting a forget message is disallowed",
                ));
            }
            if target.sender != ctx.sender {
                return Err(ProcessError::rejected(
                    ErrorCode::PermissionDenied,
                    format!("{} is not authorized to forget {hash}", ctx.sender),
                ));
            }
        }
        Ok(())
    }

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        let forget = parse(content)?;

        for hash in &forget.hashes {
            let Some(target) = messages::Entity::find_by_id(hash.clone()).one(txn).await? else {
                continue;
            };

            handler_for(&target.r#type).forget(txn, hash).await?;

            forgotten_messages::ActiveModel {
                item_hash: Set(target.item_hash.clone()),
                r#type: Set(target.r#type.clone()),
                chain: Set(target.chain.clone()),
                sender: Set(target.sender.clone()),
                signature: Set(target.signature.clone()),
                item_type: Set(target.item_type.clone()),
                time: Set(target.time),
                channel: Set(target.channel.clone()),
                forgotten_by: Set(vec![ctx.item_hash.clone()]),
            }
            .insert(txn)
            .await?;

            messages::Entity::delete_by_id(hash.clone()).exec(txn).await?;

            message_status::Entity::update(message_status::ActiveModel {
                item_hash: Set(hash.clone()),
                status: Set(MessageStatusKind::Forgotten),
                reception_time: sea_orm::ActiveValue::NotSet,
            })
            .exec(txn)
            .await?;
        }
        Ok(())
    }

    async fn forget(
        &self,
        _txn: &DatabaseTransaction,
        _item_hash: &str,
    ) -> Result<(), ProcessError> {
        Err(ProcessError::rejected(
            ErrorCode::PermissionDenied,
            "forgetting a forget message is disallowed",
        ))
    }
}

fn parse(content: &Value) -> Result<ForgetContent, ProcessError> {
    match MessageContent::parse(&MessageType::Forget, content)? {
        MessageContent::Forget(forget) => Ok(forget),
        _ => unreachable!("dispatched as forget"),
    }
}
