//! A candidate message admitted by the publisher, waiting to be fetched,
//! validated and committed by the pending-message pipeline.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::{Chain, ItemType, MessageOrigin, MessageType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pending_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_hash: String,
    pub sender: String,
    pub chain: Chain,
    #[sea_orm(column_name = "type")]
    pub r#type: MessageType,
    pub signature: Option<String>,
    pub item_type: ItemType,
    pub item_content: Option<String>,
    pub time: DateTimeWithTimeZone,
    pub channel: Option<String>,
    pub reception_time: DateTimeWithTimeZone,
    pub retries: i32,
    pub next_attempt: DateTimeWithTimeZone,
    pub fetched: bool,
    pub check_message: bool,
    pub origin: MessageOrigin,
    pub source_chain: Option<Chain>,
    pub source_height: Option<i64>,
    pub source_tx_hash: Option<String>,
    /// sha256 of `(item_hash, sender, source_chain, source_height)`, used as the
    /// idempotent-upsert conflict target since the logical key itself contains
    /// nullable columns. See `ccn_logic::publisher::logical_key_dedup_hash`.
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))", unique)]
    pub dedup_key: Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chain_txs::Entity",
        from = "Column::SourceTxHash",
        to = "super::chain_txs::Column::Hash",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    ChainTxs,
}

impl Related<super::chain_txs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChainTxs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
