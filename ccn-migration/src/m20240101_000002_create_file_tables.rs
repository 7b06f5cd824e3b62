use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TYPE "file_type" AS ENUM ('file', 'directory');
            CREATE TYPE "pin_type" AS ENUM ('tx', 'message', 'tag');

            CREATE TABLE "stored_files" (
                "hash" text PRIMARY KEY,
                "type" file_type NOT NULL,
                "size" bigint NOT NULL
            );

            CREATE TABLE "file_pins" (
                "id" bigserial PRIMARY KEY,
                "file_hash" text NOT NULL REFERENCES "stored_files"("hash") ON DELETE CASCADE,
                "pin_type" pin_type NOT NULL,
                "tx_hash" text REFERENCES "chain_txs"("hash") ON DELETE CASCADE,
                "owner" text,
                "created" timestamptz NOT NULL
            );

            CREATE INDEX "idx_file_pins_file_hash" ON "file_pins" ("file_hash");
            CREATE UNIQUE INDEX "idx_file_pins_tx_file" ON "file_pins" ("tx_hash", "file_hash") WHERE "tx_hash" IS NOT NULL;

            CREATE TABLE "file_tags" (
                "owner" text NOT NULL,
                "tag" text NOT NULL,
                "file_hash" text NOT NULL REFERENCES "stored_files"("hash") ON DELETE CASCADE,
                "last_updated" timestamptz NOT NULL,
                PRIMARY KEY ("owner", "tag")
            );

            COMMENT ON TABLE "stored_files" IS 'Content-addressed blobs known to the storage service';
            COMMENT ON TABLE "file_pins" IS 'Reference-counted pins on stored_files, scoped to a tx or a message';
            COMMENT ON TABLE "file_tags" IS 'Mutable name bound to the latest hash of a logical artifact';
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "file_tags";
            DROP TABLE "file_pins";
            DROP TABLE "stored_files";
            DROP TYPE "pin_type";
            DROP TYPE "file_type";
        "#;
        crate::from_sql(manager, sql).await
    }
}
