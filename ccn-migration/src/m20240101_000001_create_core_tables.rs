use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TYPE "chain" AS ENUM ('ethereum', 'solana', 'tezos', 'bsc');

            CREATE TYPE "chain_sync_protocol" AS ENUM ('on_chain_sync', 'off_chain_sync', 'smart_contract');

            CREATE TYPE "message_type" AS ENUM ('aggregate', 'post', 'store', 'program', 'instance', 'forget');

            CREATE TYPE "item_type" AS ENUM ('inline', 'storage', 'ipfs');

            CREATE TYPE "message_status" AS ENUM ('pending', 'processed', 'rejected', 'forgotten', 'removing');

            CREATE TYPE "message_origin" AS ENUM ('p2p', 'onchain', 'api');

            CREATE TABLE "chain_txs" (
                "hash" text PRIMARY KEY,
                "chain" chain NOT NULL,
                "height" bigint NOT NULL,
                "datetime" timestamptz NOT NULL,
                "protocol" chain_sync_protocol NOT NULL,
                "protocol_version" smallint NOT NULL,
                "content" jsonb NOT NULL,
                UNIQUE ("chain", "hash")
            );

            CREATE INDEX "idx_chain_txs_chain_height" ON "chain_txs" ("chain", "height");

            CREATE TABLE "pending_txs" (
                "tx_hash" text PRIMARY KEY REFERENCES "chain_txs"("hash") ON DELETE CASCADE,
                "creation_time" timestamptz NOT NULL
            );

            CREATE TABLE "error_codes" (
                "code" integer PRIMARY KEY,
                "description" text NOT NULL
            );

            INSERT INTO "error_codes" ("code", "description") VALUES
                (1, 'INVALID_FORMAT'),
                (2, 'CONTENT_HASH_MISMATCH'),
                (3, 'INVALID_SIGNATURE'),
                (4, 'CONTENT_VALIDATION_FAILED'),
                (5, 'VM_VOLUME_NOT_FOUND'),
                (6, 'PERMISSION_DENIED'),
                (7, 'EXCEEDED_AMT_OF_RETRIES'),
                (8, 'INTERNAL_ERROR');

            CREATE TABLE "messages" (
                "item_hash" text PRIMARY KEY,
                "type" message_type NOT NULL,
                "chain" chain NOT NULL,
                "sender" text NOT NULL,
                "signature" text,
                "item_type" item_type NOT NULL,
                "item_content" text,
                "content" jsonb NOT NULL,
                "time" timestamptz NOT NULL,
                "channel" text,
                "size" bigint NOT NULL
            );

            CREATE INDEX "idx_messages_sender" ON "messages" ("sender");
            CREATE INDEX "idx_messages_time" ON "messages" ("time");
            CREATE INDEX "idx_messages_channel" ON "messages" ("channel");

            CREATE TABLE "message_status" (
                "item_hash" text PRIMARY KEY,
                "status" message_status NOT NULL,
                "reception_time" timestamptz NOT NULL
            );

            CREATE TABLE "rejected_messages" (
                "item_hash" text PRIMARY KEY,
                "message" jsonb NOT NULL,
                "error_code" integer NOT NULL REFERENCES "error_codes"("code"),
                "details" jsonb,
                "traceback" text
            );

            CREATE TABLE "forgotten_messages" (
                "item_hash" text PRIMARY KEY,
                "type" message_type NOT NULL,
                "chain" chain NOT NULL,
                "sender" text NOT NULL,
                "signature" text,
                "item_type" item_type NOT NULL,
                "time" timestamptz NOT NULL,
                "channel" text,
                "forgotten_by" text[] NOT NULL
            );

            CREATE TABLE "message_confirmations" (
                "id" bigserial PRIMARY KEY,
                "item_hash" text NOT NULL,
                "tx_hash" text NOT NULL REFERENCES "chain_txs"("hash") ON DELETE CASCADE,
                UNIQUE ("item_hash", "tx_hash")
            );

            CREATE TABLE "pending_messages" (
                "id" bigserial PRIMARY KEY,
                "item_hash" text NOT NULL,
                "sender" text NOT NULL,
                "chain" chain NOT NULL,
                "type" message_type NOT NULL,
                "signature" text,
                "item_type" item_type NOT NULL,
                "item_content" text,
                "time" timestamptz NOT NULL,
                "channel" text,
                "reception_time" timestamptz NOT NULL,
                "retries" integer NOT NULL DEFAULT 0,
                "next_attempt" timestamptz NOT NULL,
                "fetched" boolean NOT NULL DEFAULT false,
                "check_message" boolean NOT NULL DEFAULT true,
                "origin" message_origin NOT NULL,
                "source_chain" chain,
                "source_height" bigint,
                "source_tx_hash" text REFERENCES "chain_txs"("hash") ON DELETE SET NULL,
                "dedup_key" bytea NOT NULL,
                UNIQUE ("dedup_key")
            );

            CREATE INDEX "idx_pending_messages_retries_time" ON "pending_messages" ("retries" ASC, "time" ASC);
            CREATE INDEX "idx_pending_messages_next_attempt" ON "pending_messages" ("next_attempt");
            CREATE INDEX "idx_pending_messages_item_hash" ON "pending_messages" ("item_hash");

            CREATE TABLE "aggregates" (
                "owner" text NOT NULL,
                "key" text NOT NULL,
                "item_hash" text NOT NULL,
                "time" double precision NOT NULL,
                "content" jsonb NOT NULL,
                PRIMARY KEY ("owner", "key")
            );

            COMMENT ON TABLE "chain_txs" IS 'An on-chain transaction carrying a sync envelope, immutable once recorded';
            COMMENT ON TABLE "pending_txs" IS 'A chain_tx awaiting expansion into candidate pending messages';
            COMMENT ON TABLE "pending_messages" IS 'Admitted candidates awaiting fetch/validate/commit by the processor';
            COMMENT ON TABLE "messages" IS 'Processed and validated messages';
            COMMENT ON TABLE "aggregates" IS 'Merged (owner, key) element, last-writer-wins by time then item_hash';
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "aggregates";
            DROP TABLE "pending_messages";
            DROP TABLE "message_confirmations";
            DROP TABLE "forgotten_messages";
            DROP TABLE "rejected_messages";
            DROP TABLE "message_status";
            DROP TABLE "messages";
            DROP TABLE "error_codes";
            DROP TABLE "pending_txs";
            DROP TABLE "chain_txs";
            DROP TYPE "message_origin";
            DROP TYPE "message_status";
            DROP TYPE "item_type";
            DROP TYPE "message_type";
            DROP TYPE "chain_sync_protocol";
            DROP TYPE "chain";
        "#;
        crate::from_sql(manager, sql).await
    }
}
