//! Reference-counting pin on a `StoredFile`, scoped to a tx, a message, or nothing
//! (a bare pin kept alive only by a `file_tags` row).

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::PinType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "file_pins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub file_hash: String,
    pub pin_type: PinType,
    pub tx_hash: Option<String>,
    pub owner: Option<String>,
    pub created: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stored_files::Entity",
        from = "Column::FileHash",
        to = "super::stored_files::Column::Hash",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    StoredFiles,
    #[sea_orm(
        belongs_to = "super::chain_txs::Entity",
        from = "Column::TxHash",
        to = "super::chain_txs::Column::Hash",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ChainTxs,
}

impl Related<super::stored_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoredFiles.def()
    }
}

impl Related<super::chain_txs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChainTxs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
