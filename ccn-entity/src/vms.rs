//! A `program`/`instance` declaration. One row per message that created or
//! amended a VM; `vm_versions` tracks which one is current.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::VmType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "vms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_hash: String,
    pub owner: String,
    pub vm_type: VmType,
    pub code_ref: Option<String>,
    pub runtime_ref: Option<String>,
    pub data_ref: Option<String>,
    pub rootfs_parent_ref: Option<String>,
    pub created: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vm_volumes::Entity")]
    VmVolumes,
    #[sea_orm(has_one = "super::vm_versions::Entity")]
    VmVersions,
}

impl Related<super::vm_volumes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VmVolumes.def()
    }
}

impl Related<super::vm_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VmVersions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
