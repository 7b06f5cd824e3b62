//! Many-to-many: a message may be confirmed by multiple txs on multiple chains (I5).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "message_confirmations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_hash: String,
    pub tx_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::messages::Entity",
        from = "Column::ItemHash",
        to = "super::messages::Column::ItemHash",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Messages,
    #[sea_orm(
        belongs_to = "super::chain_txs::Entity",
        from = "Column::TxHash",
        to = "super::chain_txs::Column::Hash",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ChainTxs,
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::chain_txs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChainTxs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
