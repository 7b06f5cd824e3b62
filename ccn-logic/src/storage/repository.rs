//! DB-backed accessors for `stored_files` / `file_pins` / `file_tags`, grounded
//! on `da-indexer-logic/src/celestia/repository/blobs.rs`'s
//! insert-with-`on_conflict` style.

use ccn_entity::{
    file_pins, file_tags, stored_files,
    sea_orm_active_enums::{FileType, PinType},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter,
};

pub async fn upsert_stored_file<C: ConnectionTrait>(
    db: &C,
    hash: &str,
    file_type: FileType,
    size: i64,
) -> Result<(), sea_orm::DbErr> {
    let model = stored_files::ActiveModel {
        hash: Set(hash.to_string()),
        r#type: Set(file_type),
        size: Set(size),
    };
    stored_files::Entity::insert(model)
        .on_conflict(
            OnConflict::column(stored_files::Column::Hash)
                .do_nothing()
                .to_owned(),
        )
        .on_empty_do_nothing()
        .exec(db)
        .await?;
    Ok(())
}

pub async fn upsert_tx_file_pin<C: ConnectionTrait>(
    db: &C,
    file_hash: &str,
    tx_hash: &str,
    created: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    let existing = file_pins::Entity::find()
        .filter(file_pins::Column::FileHash.eq(file_hash))
        .filter(file_pins::Column::TxHash.eq(tx_hash))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let model = file_pins::ActiveModel {
        file_hash: Set(file_hash.to_string()),
        pin_type: Set(PinType::Tx),
        tx_hash: Set(Some(tx_hash.to_string())),
        owner: Set(None),
        created: Set(created.into()),
        ..Default::default()
    };
    model.insert(db).await?;
    Ok(())
}

pub async fn upsert_message_file_pin<C: ConnectionTrait>(
    db: &C,
    file_hash: &str,
    item_hash: &str,
    owner: &str,
    created: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    let model = file_pins::ActiveModel {
        file_hash: Set(file_hash.to_string()),
        pin_type: Set(PinType::Message),
        tx_hash: Set(Some(item_hash.to_string())),
        owner: Set(Some(owner.to_string())),
        created: Set(created.into()),
        ..Default::default()
    };
    model.insert(db).await?;
    Ok(())
}

/// Exact-pin lookup, the `ref` (not `tag`) half of `cost.py::_get_file_from_ref`.
pub async fn get_message_file_pin<C: ConnectionTrait>(
    db: &C,
    item_hash: &str,
) -> Result<Option<stored_files::Model>, sea_orm::DbErr> {
    let pin = file_pins::Entity::find()
        .filter(file_pins::Column::TxHash.eq(item_hash))
        .filter(file_pins::Column::PinType.eq(PinType::Message))
        .one(db)
        .await?;
    match pin {
        None => Ok(None),
        Some(pin) => stored_files::Entity::find_by_id(pin.file_hash).one(db).await,
    }
}

/// Mutable-tag lookup, the `use_latest=true` half of `cost.py::_get_file_from_ref`.
pub async fn get_file_tag<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    tag: &str,
) -> Result<Option<stored_files::Model>, sea_orm::DbErr> {
    let tag_row = file_tags::Entity::find_by_id((owner.to_string(), tag.to_string()))
        .one(db)
        .await?;
    match tag_row {
        None => Ok(None),
        Some(tag_row) => {
            stored_files::Entity::find_by_id(tag_row.file_hash)
                .one(db)
                .await
        }
    }
}

pub async fn upsert_file_tag<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    tag: &str,
    file_hash: &str,
    last_updated: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    let model = file_tags::ActiveModel {
        owner: Set(owner.to_string()),
        tag: Set(tag.to_string()),
        file_hash: Set(file_hash.to_string()),
        last_updated: Set(last_updated.into()),
    };
    file_tags::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([file_tags::Column::Owner, file_tags::Column::Tag])
                .update_column(file_tags::Column::FileHash)
                .update_column(file_tags::Column::LastUpdated)
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}
