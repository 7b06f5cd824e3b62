//! A blockchain transaction carrying a sync envelope. Immutable once recorded.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::{Chain, ChainSyncProtocol};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "chain_txs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub hash: String,
    pub chain: Chain,
    pub height: i64,
    pub datetime: DateTimeWithTimeZone,
    pub protocol: ChainSyncProtocol,
    pub protocol_version: i16,
    pub content: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::pending_txs::Entity")]
    PendingTxs,
    #[sea_orm(has_many = "super::message_confirmations::Entity")]
    MessageConfirmations,
    #[sea_orm(has_many = "super::file_pins::Entity")]
    FilePins,
}

impl Related<super::pending_txs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingTxs.def()
    }
}

impl Related<super::message_confirmations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MessageConfirmations.def()
    }
}

impl Related<super::file_pins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilePins.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
