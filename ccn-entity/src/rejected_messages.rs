//! A message that failed permanent validation; see `ErrorCode` for the reasons.

use sea_orm::entity::prelude::*;

use crate::sea_orm_active_enums::ErrorCode;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rejected_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_hash: String,
    pub message: Json,
    pub error_code: ErrorCode,
    pub details: Option<Json>,
    pub traceback: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
