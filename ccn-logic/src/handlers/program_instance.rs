//! `program` / `instance`: resolve every declared volume ref to a
//! `StoredFile`, rejecting with `VM_VOLUME_NOT_FOUND` if any ref is missing;
//! create a `vms` row plus a `vm_versions` current-version pointer (spec
//! §4.5).

use async_trait::async_trait;
use ccn_entity::{
    sea_orm_active_enums::{VmType, VolumeKind},
    vm_versions, vm_volumes, vms,
};
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, DatabaseTransaction, EntityTrait,
};
use serde_json::Value;

use super::{cost, PendingContext, TypeHandler};
use crate::{
    content::{InstanceContent, MessageContent, ProgramContent, Volume, VolumeRef},
    errors::{ErrorCode, ProcessError},
};

pub struct ProgramInstanceHandler {
    vm_type: VmType,
}

impl ProgramInstanceHandler {
    pub fn program() -> Self {
        Self {
            vm_type: VmType::Program,
        }
    }

    pub fn instance() -> Self {
        Self {
            vm_type: VmType::Instance,
        }
    }
}

/// One resolved (or missing) volume ref, gathered in `fetch_related` and
/// consumed by `validate`/`commit`.
struct ResolvedVolume {
    mount_path: Option<String>,
    kind: VolumeKind,
    file_hash: Option<String>,
    size_mib: Option<i64>,
    missing_ref: Option<String>,
}

/// Declared refs for `program`/`instance`, normalized to one shape so both
/// message types share resolution logic.
struct Declaration {
    owner: String,
    code: Option<VolumeRef>,
    runtime: Option<VolumeRef>,
    data: Option<VolumeRef>,
    rootfs_parent: Option<VolumeRef>,
    rootfs_size_mib: Option<u64>,
    volumes: Vec<Volume>,
}

fn declaration(vm_type: &VmType, content: &Value) -> Result<Declaration, ProcessError> {
    match vm_type {
        VmType::Program => {
            let program = match MessageContent::parse(
                &ccn_entity::sea_orm_active_enums::MessageType::Program,
                content,
            )? {
                MessageContent::Program(program) => program,
                _ => unreachable!("dispatched as program"),
            };
            let ProgramContent {
                owner,
                code,
                runtime,
                data,
                volumes,
            } = program;
            Ok(Declaration {
                owner,
                code: Some(code),
                runtime: Some(runtime),
                data,
                rootfs_parent: None,
                rootfs_size_mib: None,
                volumes,
            })
        }
        VmType::Instance => {
            let instance = match MessageContent::parse(
                &ccn_entity::sea_orm_active_enums::MessageType::Instance,
                content,
            )? {
                MessageContent::Instance(instance) => instance,
                _ => unreachable!("dispatched as instance"),
            };
            let InstanceContent {
                owner,
                rootfs,
                volumes,
            } = instance;
            Ok(Declaration {
                owner,
                code: None,
                runtime: None,
                data: None,
                rootfs_parent: Some(rootfs.parent),
                rootfs_size_mib: Some(rootfs.size_mib),
                volumes,
            })
        }
    }
}

#[async_trait]
impl TypeHandler for ProgramInstanceHandler {
    async fn fetch_related(
        &self,
        txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        content: &Value,
    ) -> Result<Value, ProcessError> {
        let decl = declaration(&self.vm_type, content)?;
        let mut resolved = Vec::new();

        for (label, vref, kind) in [
            ("code", &decl.code, VolumeKind::Immutable),
            ("runtime", &decl.runtime, VolumeKind::Immutable),
            ("data", &decl.data, VolumeKind::Persistent),
            ("rootfs.parent", &decl.rootfs_parent, VolumeKind::Persistent),
        ] {
            let Some(vref) = vref else { continue };
            resolved.push(resolve_one(txn, &decl.owner, label, vref, kind, None).await?);
        }

        for (index, volume) in decl.volumes.iter().enumerate() {
            match volume {
                Volume::Immutable {
                    reference,
                    use_latest,
                    mount,
                } => {
                    let vref = VolumeRef {
                        reference: reference.clone(),
                        use_latest: *use_latest,
                    };
                    resolved.push(
                        resolve_one(
                            txn,
                            &decl.owner,
                            &format!("volumes[{index}]"),
                            &vref,
                            VolumeKind::Immutable,
                            mount.clone(),
                        )
                        .await?,
                    );
                }
                Volume::Ephemeral { size_mib, mount } => resolved.push(ResolvedVolume {
                    mount_path: mount.clone(),
                    kind: VolumeKind::Ephemeral,
                    file_hash: None,
                    size_mib: Some(*size_mib as i64),
                    missing_ref: None,
                }),
                Volume::Host {
                    size_mib, mount, ..
                } => resolved.push(ResolvedVolume {
                    mount_path: mount.clone(),
                    kind: VolumeKind::Persistent,
                    file_hash: None,
                    size_mib: Some(*size_mib as i64),
                    missing_ref: None,
                }),
            }
        }

        Ok(serde_json::to_value(resolved.iter().map(ResolvedVolumeDto::from).collect::<Vec<_>>())
            .expect("resolved volumes always serialize"))
    }

    async fn validate(
        &self,
        _txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        _content: &Value,
        extra: &Value,
    ) -> Result<(), ProcessError> {
        let resolved: Vec<ResolvedVolumeDto> =
            serde_json::from_value(extra.clone()).expect("written by fetch_related");
        let missing: Vec<String> = resolved
            .iter()
            .filter_map(|v| v.missing_ref.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ProcessError::rejected_with_details(
                ErrorCode::VmVolumeNotFound,
                "one or more volume refs did not resolve to a known file",
                serde_json::json!({ "errors": missing }),
            ));
        }
        Ok(())
    }

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        extra: &Value,
    ) -> Result<(), ProcessError> {
        let decl = declaration(&self.vm_type, content)?;
        let resolved: Vec<ResolvedVolumeDto> =
            serde_json::from_value(extra.clone()).expect("written by fetch_related");

        vms::Entity::insert(vms::ActiveModel {
            item_hash: Set(ctx.item_hash.clone()),
            owner: Set(decl.owner.clone()),
            vm_type: Set(self.vm_type.clone()),
            code_ref: Set(decl.code.as_ref().map(|r| r.reference.clone())),
            runtime_ref: Set(decl.runtime.as_ref().map(|r| r.reference.clone())),
            data_ref: Set(decl.data.as_ref().map(|r| r.reference.clone())),
            rootfs_parent_ref: Set(decl.rootfs_parent.as_ref().map(|r| r.reference.clone())),
            created: Set(ctx.time.into()),
        })
        .on_conflict(
            OnConflict::column(vms::Column::ItemHash)
                .do_nothing()
                .to_owned(),
        )
        .on_empty_do_nothing()
        .exec(txn)
        .await?;

        for volume in &resolved {
            vm_volumes::ActiveModel {
                vm_hash: Set(ctx.item_hash.clone()),
                mount_path: Set(volume.mount_path.clone()),
                volume_kind: Set(volume_kind_from_str(&volume.kind)),
                file_hash: Set(volume.file_hash.clone()),
                size_mib: Set(volume.size_mib),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        vm_versions::Entity::insert(vm_versions::ActiveModel {
            vm_hash: Set(ctx.item_hash.clone()),
            current_hash: Set(ctx.item_hash.clone()),
            updated: Set(Utc::now().into()),
        })
        .on_conflict(
            OnConflict::column(vm_versions::Column::VmHash)
                .update_columns([vm_versions::Column::CurrentHash, vm_versions::Column::Updated])
                .to_owned(),
        )
        .exec(txn)
        .await?;

        Ok(())
    }

    async fn forget(&self, txn: &DatabaseTransaction, item_hash: &str) -> Result<(), ProcessError> {
        vm_versions::Entity::delete_by_id(item_hash.to_string())
            .exec(txn)
            .await?;
        vms::Entity::delete_by_id(item_hash.to_string())
            .exec(txn)
            .await?;
        Ok(())
    }
}

async fn resolve_one(
    txn: &DatabaseTransaction,
    owner: &str,
    label: &str,
    vref: &VolumeRef,
    kind: VolumeKind,
    mount: Option<String>,
) -> Result<ResolvedVolume, ProcessError> {
    match cost::resolve_ref(txn, owner, vref).await? {
        Some(file) => Ok(ResolvedVolume {
            mount_path: mount,
            kind,
            file_hash: Some(file.hash.clone()),
            size_mib: Some(cost::volume_size_mib(&file)),
            missing_ref: None,
        }),
        None => Ok(ResolvedVolume {
            mount_path: mount,
            kind,
            file_hash: None,
            size_mib: None,
            missing_ref: Some(format!("{label}:{}", vref.reference)),
        }),
    }
}

/// `ResolvedVolume` minus the borrow, so it round-trips through the
/// `fetch_related` → `validate`/`commit` JSON handoff. `VolumeKind` isn't
/// `serde`-derived (it's a sea-orm active enum), hence the string encoding.
#[derive(serde::Serialize, serde::Deserialize)]
struct ResolvedVolumeDto {
    mount_path: Option<String>,
    kind: String,
    file_hash: Option<String>,
    size_mib: Option<i64>,
    missing_ref: Option<String>,
}

impl From<&ResolvedVolume> for ResolvedVolumeDto {
    fn from(v: &ResolvedVolume) -> Self {
        Self {
            mount_path: v.mount_path.clone(),
            kind: volume_kind_to_str(&v.kind).to_string(),
            file_hash: v.file_hash.clone(),
            size_mib: v.size_mib,
            missing_ref: v.missing_ref.clone(),
        }
    }
}

fn volume_kind_to_str(kind: &VolumeKind) -> &'static str {
    match kind {
        VolumeKind::Ephemeral => "ephemeral",
        VolumeKind::Persistent => "persistent",
        VolumeKind::Immutable => "immutable",
    }
}

fn volume_kind_from_str(kind: &str) -> VolumeKind {
    match kind {
        "ephemeral" => VolumeKind::Ephemeral,
        "immutable" => VolumeKind::Immutable,
        _ => VolumeKind::Persistent,
    }
}
