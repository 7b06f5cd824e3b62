//! Volume ref resolution and size accounting, carried over from
//! `cost.py::_get_file_from_ref` / `get_volume_size` since the VM handlers
//! need both to populate `vm_volumes`/`vm_versions`.

use ccn_entity::stored_files;
use sea_orm::ConnectionTrait;

use crate::{content::VolumeRef, storage::repository};

const BYTES_PER_MIB: i64 = 1024 * 1024;

/// `ref` (exact pin) when `use_latest = false`, `tag` (mutable, dereferenced
/// through `file_tags`) when `use_latest = true`.
pub async fn resolve_ref<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    vref: &VolumeRef,
) -> Result<Option<stored_files::Model>, sea_orm::DbErr> {
    if vref.use_latest {
        repository::get_file_tag(db, owner, &vref.reference).await
    } else {
        repository::get_message_file_pin(db, &vref.reference).await
    }
}

pub fn volume_size_mib(file: &stored_files::Model) -> i64 {
    (file.size + BYTES_PER_MIB - 1) / BYTES_PER_MIB
}
