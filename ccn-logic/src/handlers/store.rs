//! `store`: pin the referenced content, register the pin, and enforce a
//! per-sender storage quota (spec §4.5).

use async_trait::async_trait;
use ccn_entity::{
    file_pins, sea_orm_active_enums::{FileType, PinType},
    stored_files,
};
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use serde_json::Value;

use super::{PendingContext, TypeHandler};
use crate::{
    content::{MessageContent, StoreContent},
    errors::{ErrorCode, ProcessError},
    storage::repository,
};

/// Default per-sender pinned-storage quota, mirroring `aleph/config.py`'s
/// `storage.max_size_mib` default.
const DEFAULT_QUOTA_MIB: i64 = 1024 * 50;

pub struct StoreHandler;

#[async_trait]
impl TypeHandler for StoreHandler {
    async fn validate(
        &self,
        _txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        MessageContent::parse(&ccn_entity::sea_orm_active_enums::MessageType::Store, content)?;
        Ok(())
    }

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        _extra: &Value,
    ) -> Result<(), ProcessError> {
        let store: StoreContent = match MessageContent::parse(
            &ccn_entity::sea_orm_active_enums::MessageType::Store,
            content,
        )? {
            MessageContent::Store(store) => store,
            _ => unreachable!("dispatched as store"),
        };

        // Registers a zero-size placeholder if the content hasn't been seen
        // by the Storage Service yet; `on_conflict().do_nothing()` means a
        // real size recorded elsewhere (e.g. off-chain sync) is never
        // clobbered.
        repository::upsert_stored_file(txn, &store.item_hash, FileType::File, 0).await?;

        let pins = file_pins::Entity::find()
            .filter(file_pins::Column::Owner.eq(&store.address))
            .all(txn)
            .await?;
        let mut used: i64 = 0;
        for pin in &pins {
            if let Some(file) = stored_files::Entity::find_by_id(pin.file_hash.clone())
                .one(txn)
                .await?
            {
                used += file.size;
            }
        }

        if used / (1024 * 1024) > DEFAULT_QUOTA_MIB {
            return Err(ProcessError::rejected(
                ErrorCode::PermissionDenied,
                format!("sender {} exceeds storage quota", store.address),
            ));
        }

        repository::upsert_message_file_pin(
            txn,
            &store.item_hash,
            &ctx.item_hash,
            &store.address,
            ctx.time,
        )
        .await?;

        Ok(())
    }

    async fn forget(
        &self,
        txn: &DatabaseTransaction,
        item_hash: &str,
    ) -> Result<(), ProcessError> {
        file_pins::Entity::delete_many()
            .filter(file_pins::Column::PinType.eq(PinType::Message))
            .filter(file_pins::Column::TxHash.eq(item_hash))
            .exec(txn)
            .await?;
        Ok(())
    }
}
