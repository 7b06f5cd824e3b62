//! Tombstone left behind after a `forget` message removes a processed message.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::{Chain, ItemType, MessageType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "forgotten_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_hash: String,
    #[sea_orm(column_name = "type")]
    pub r#type: MessageType,
    pub chain: Chain,
    pub sender: String,
    pub signature: Option<String>,
    pub item_type: ItemType,
    pub time: DateTimeWithTimeZone,
    pub channel: Option<String>,
    pub forgotten_by: Vec<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
