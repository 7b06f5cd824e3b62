//! A message that was processed and validated by the core.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::{Chain, ItemType, MessageType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_hash: String,
    #[sea_orm(column_name = "type")]
    pub r#type: MessageType,
    pub chain: Chain,
    pub sender: String,
    pub signature: Option<String>,
    pub item_type: ItemType,
    pub item_content: Option<String>,
    pub content: Json,
    pub time: DateTimeWithTimeZone,
    pub channel: Option<String>,
    pub size: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message_confirmations::Entity")]
    MessageConfirmations,
    #[sea_orm(has_one = "super::message_status::Entity")]
    MessageStatus,
}

impl Related<super::message_confirmations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MessageConfirmations.def()
    }
}

impl Related<super::message_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MessageStatus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
