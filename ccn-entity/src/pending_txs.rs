//! A `ChainTx` awaiting expansion into candidate pending messages.
//! Deleted once the tx has been fully processed (§4.2 of the core spec).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pending_txs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tx_hash: String,
    pub creation_time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chain_txs::Entity",
        from = "Column::TxHash",
        to = "super::chain_txs::Column::Hash",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ChainTxs,
}

impl Related<super::chain_txs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChainTxs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
