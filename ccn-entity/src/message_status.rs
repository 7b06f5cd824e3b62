//! Single source of truth for a message's lifecycle state (I1/I2 of the core spec).

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::MessageStatus as MessageStatusKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "message_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_hash: String,
    pub status: MessageStatusKind,
    pub reception_time: DateTimeWithTimeZone,
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
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
