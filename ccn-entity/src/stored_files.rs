//! A content-addressed blob known to the storage service.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::FileType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "stored_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub hash: String,
    #[sea_orm(column_name = "type")]
    pub r#type: FileType,
    pub size: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::file_pins::Entity")]
    FilePins,
    #[sea_orm(has_many = "super::file_tags::Entity")]
    FileTags,
}

impl Related<super::file_pins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilePins.def()
    }
}

impl Related<super::file_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FileTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
