//! Current-version pointer for a VM: `vm_hash` is the base (first) declaration,
//! `current_hash` is the most recent amending message to win last-writer-wins.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "vm_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub vm_hash: String,
    pub current_hash: String,
    pub updated: DateTimeWithTimeZone,
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
}

impl Related<super::vms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
