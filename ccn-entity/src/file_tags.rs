//! A mutable name bound to the latest content-hash of a logical artifact,
//! dereferenced by volume references with `use_latest=true`.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "file_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: String,
    pub file_hash: String,
    pub last_updated: DateTimeWithTimeZone,
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
}

impl Related<super::stored_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoredFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
