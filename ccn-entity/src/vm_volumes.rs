//! One resolved volume mount for a `vms` row (`rootfs` counts as a volume too).

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::VolumeKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "vm_volumes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub vm_hash: String,
    pub mount_path: Option<String>,
    pub volume_kind: VolumeKind,
    pub file_hash: Option<String>,
    pub size_mib: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vms::Entity",
        from = "Column::VmHash",
        to = "super::vms::Column::ItemHash",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Vms,
    #[sea_orm(
        belongs_to = "super::stored_files::Entity",
        from = "Column::FileHash",
        to = "super::stored_files::Column::Hash",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    StoredFiles,
}

impl Related<super::vms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vms.def()
    }
}

impl Related<super::stored_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoredFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
