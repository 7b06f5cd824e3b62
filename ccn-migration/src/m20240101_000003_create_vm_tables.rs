use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TYPE "vm_type" AS ENUM ('program', 'instance');
            CREATE TYPE "volume_kind" AS ENUM ('ephemeral', 'persistent', 'immutable');

            CREATE TABLE "vms" (
                "item_hash" text PRIMARY KEY,
                "owner" text NOT NULL,
                "vm_type" vm_type NOT NULL,
                "code_ref" text,
                "runtime_ref" text,
                "data_ref" text,
                "rootfs_parent_ref" text,
                "created" timestamptz NOT NULL
            );

            CREATE INDEX "idx_vms_owner" ON "vms" ("owner");

            CREATE TABLE "vm_versions" (
                "vm_hash" text PRIMARY KEY REFERENCES "vms"("item_hash") ON DELETE CASCADE,
                "current_hash" text NOT NULL,
                "updated" timestamptz NOT NULL
            );

            CREATE TABLE "vm_volumes" (
                "id" bigserial PRIMARY KEY,
                "vm_hash" text NOT NULL REFERENCES "vms"("item_hash") ON DELETE CASCADE,
                "mount_path" text,
                "volume_kind" volume_kind NOT NULL,
                "file_hash" text REFERENCES "stored_files"("hash") ON DELETE SET NULL,
                "size_mib" bigint
            );

            CREATE INDEX "idx_vm_volumes_vm_hash" ON "vm_volumes" ("vm_hash");

            COMMENT ON TABLE "vms" IS 'One row per program/instance message that created or amended a VM';
            COMMENT ON TABLE "vm_versions" IS 'Current-version pointer: which amending message last won';
            COMMENT ON TABLE "vm_volumes" IS 'Resolved volumes (rootfs, code, runtime, data, extra volumes) for a vm';
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "vm_volumes";
            DROP TABLE "vm_versions";
            DROP TABLE "vms";
            DROP TYPE "volume_kind";
            DROP TYPE "vm_type";
        "#;
        crate::from_sql(manager, sql).await
    }
}
