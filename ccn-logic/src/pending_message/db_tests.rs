//! `TestDbGuard`-backed coverage of the pending-message pipeline's concrete
//! scenarios, grounded on `da-indexer-logic/src/celestia/tests/blobs.rs`'s
//! `TestDbGuard`-smoke-test shape.

use std::sync::Arc;

use blockscout_service_launcher::test_database::TestDbGuard;
use ccn_entity::{
    forgotten_messages, message_status, messages, rejected_messages,
    sea_orm_active_enums::{MessageOrigin, MessageStatus as MessageStatusKind},
    vm_versions, vm_volumes, vms,
};
use chrono::Utc;
use migration::Migrator;
use pretty_assertions::assert_eq;
use sea_orm::EntityTrait;
use sha2::{Digest, Sha256};

use crate::{
    pending_message::{Outcome, PendingMessageProcessor, PendingMessagesSettings},
    publisher::MessagePublisher,
    scheduler::RetrySettings,
    storage::{settings::StorageSettings, StorageEngine, StorageService},
};

struct NullEngine;

#[async_trait::async_trait]
impl StorageEngine for NullEngine {
    async fn read(&self, _hash: &str) -> std::io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn write(&self, _hash: &str, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

fn test_storage() -> StorageService {
    StorageService::new(
        Arc::new(NullEngine),
        &StorageSettings {
            folder: "/tmp/ccn-pending-message-db-tests".into(),
            ipfs: crate::storage::settings::IpfsSettings {
                enabled: false,
                ..Default::default()
            },
        },
    )
}

async fn setup(test_name: &str) -> (TestDbGuard, MessagePublisher, PendingMessageProcessor) {
    let db = TestDbGuard::new::<Migrator>(test_name).await;
    let publisher = MessagePublisher::new(db.client().as_ref().clone(), None);
    let processor = PendingMessageProcessor::new(
        db.client().as_ref().clone(),
        test_storage(),
        RetrySettings::default(),
        &PendingMessagesSettings::default(),
    );
    (db, publisher, processor)
}

fn inline_candidate(
    item_hash_content: &serde_json::Value,
    message_type: &str,
    sender: &str,
) -> (String, serde_json::Value) {
    let item_content = serde_json::to_string(item_hash_content).expect("content serializes");
    let item_hash = hex::encode(Sha256::digest(item_content.as_bytes()));
    let candidate = serde_json::json!({
        "item_hash": item_hash,
        "sender": sender,
        "chain": "ethereum",
        "type": message_type,
        "item_type": "inline",
        "time": 1_700_000_000.0,
        "item_content": item_content,
    });
    (item_hash, candidate)
}

/// Scenario 1 (Instance happy-path): an `instance` with a resolvable
/// `rootfs.parent` ref, one ephemeral volume, three host (persistent)
/// volumes and one immutable (tag-resolved) volume all commit successfully.
#[tokio::test]
async fn instance_happy_path_resolves_all_volumes_and_commits() {
    let (db, publisher, processor) = setup("instance_happy_path_resolves_all_volumes_and_commits").await;
    let conn = db.client();
    let owner = "0xowner".to_string();

    crate::storage::repository::upsert_stored_file(
        conn.as_ref(),
        "rootfs-parent-file",
        ccn_entity::sea_orm_active_enums::FileType::File,
        2 * 1024 * 1024,
    )
    .await
    .unwrap();
    crate::storage::repository::upsert_message_file_pin(
        conn.as_ref(),
        "rootfs-parent-file",
        "549ec4",
        &owner,
        Utc::now(),
    )
    .await
    .unwrap();

    crate::storage::repository::upsert_stored_file(
        conn.as_ref(),
        "immutable-volume-file",
        ccn_entity::sea_orm_active_enums::FileType::File,
        1024 * 1024,
    )
    .await
    .unwrap();
    crate::storage::repository::upsert_file_tag(
        conn.as_ref(),
        &owner,
        "abc123",
        "immutable-volume-file",
        Utc::now(),
    )
    .await
    .unwrap();

    let content = serde_json::json!({
        "owner": owner,
        "rootfs": {"parent": {"ref": "549ec4", "use_latest": false}, "size_mib": 2000},
        "volumes": [
            {"persistence": "ephemeral", "size_mib": 100, "mount": "/tmp"},
            {"persistence": "host", "size_mib": 100, "mount": "/a", "name": "a"},
            {"persistence": "host", "size_mib": 100, "mount": "/b", "name": "b"},
            {"persistence": "host", "size_mib": 100, "mount": "/c", "name": "c"},
            {"persistence": "immutable", "ref": "abc123", "use_latest": true, "mount": "/d"},
        ],
    });
    let (item_hash, candidate) = inline_candidate(&content, "instance", &owner);

    let row = publisher
        .add_pending_message(&candidate, Utc::now(), MessageOrigin::Api, None, false, None, None)
        .await
        .unwrap()
        .expect("well-formed candidate is admitted");

    let outcome = processor.process_one(row.id).await.unwrap();
    assert_eq!(outcome, Some(Outcome::Committed));

    assert!(messages::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_some());
    let status = message_status::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("message_status row exists");
    assert_eq!(status.status, MessageStatusKind::Processed);

    assert!(vms::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_some());
    let version = vm_versions::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("vm_versions row exists");
    assert_eq!(version.current_hash, item_hash);

    let volumes = vm_volumes::Entity::find()
        .all(conn.as_ref())
        .await
        .unwrap()
        .into_iter()
        .filter(|v| v.vm_hash == item_hash)
        .collect::<Vec<_>>();
    assert_eq!(volumes.len(), 6, "rootfs.parent plus the 5 declared volumes");
    let ephemeral = volumes
        .iter()
        .filter(|v| v.volume_kind == ccn_entity::sea_orm_active_enums::VolumeKind::Ephemeral)
        .count();
    let immutable = volumes
        .iter()
        .filter(|v| v.volume_kind == ccn_entity::sea_orm_active_enums::VolumeKind::Immutable)
        .count();
    let persistent = volumes
        .iter()
        .filter(|v| v.volume_kind == ccn_entity::sea_orm_active_enums::VolumeKind::Persistent)
        .count();
    assert_eq!(ephemeral, 1);
    assert_eq!(immutable, 1);
    assert_eq!(persistent, 4, "3 host volumes plus rootfs.parent");
}

/// Scenario 2 (Missing volume rejection): an `instance` referencing a `code`/
/// `data`/volume ref that never resolves is rejected with
/// `VM_VOLUME_NOT_FOUND` and the missing refs are recorded in `details.errors`.
#[tokio::test]
async fn instance_with_missing_volume_is_rejected() {
    let (db, publisher, processor) = setup("instance_with_missing_volume_is_rejected").await;
    let conn = db.client();
    let owner = "0xowner".to_string();

    let content = serde_json::json!({
        "owner": owner,
        "rootfs": {"parent": {"ref": "does-not-exist", "use_latest": false}, "size_mib": 2000},
        "volumes": [],
    });
    let (item_hash, candidate) = inline_candidate(&content, "instance", &owner);

    let row = publisher
        .add_pending_message(&candidate, Utc::now(), MessageOrigin::Api, None, false, None, None)
        .await
        .unwrap()
        .expect("well-formed candidate is admitted");

    let outcome = processor.process_one(row.id).await.unwrap();
    assert_eq!(outcome, Some(Outcome::Rejected));

    let status = message_status::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("message_status row exists");
    assert_eq!(status.status, MessageStatusKind::Rejected);

    let rejected = rejected_messages::Entity::find_by_id(item_hash)
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("rejected_messages row exists");
    assert_eq!(
        rejected.error_code,
        ccn_entity::sea_orm_active_enums::ErrorCode::VmVolumeNotFound
    );
    let errors = rejected.details.unwrap()["errors"].as_array().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("does-not-exist"));
}

/// Scenario 3 (Forget lifecycle): after an instance is committed, a `forget`
/// from its owner deletes the `vms`/`vm_versions` rows, flips
/// `message_status` to `forgotten` and writes a `forgotten_messages`
/// tombstone naming the forgetting message.
#[tokio::test]
async fn forget_removes_instance_and_writes_tombstone() {
    let (db, publisher, processor) = setup("forget_removes_instance_and_writes_tombstone").await;
    let conn = db.client();
    let owner = "0xowner".to_string();

    let instance_content = serde_json::json!({
        "owner": owner,
        "rootfs": {"parent": {"ref": "549ec4", "use_latest": false}, "size_mib": 2000},
        "volumes": [],
    });
    crate::storage::repository::upsert_stored_file(
        conn.as_ref(),
        "rootfs-parent-file",
        ccn_entity::sea_orm_active_enums::FileType::File,
        1024,
    )
    .await
    .unwrap();
    crate::storage::repository::upsert_message_file_pin(
        conn.as_ref(),
        "rootfs-parent-file",
        "549ec4",
        &owner,
        Utc::now(),
    )
    .await
    .unwrap();

    let (instance_hash, instance_candidate) = inline_candidate(&instance_content, "instance", &owner);
    let row = publisher
        .add_pending_message(&instance_candidate, Utc::now(), MessageOrigin::Api, None, false, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processor.process_one(row.id).await.unwrap(), Some(Outcome::Committed));

    let forget_content = serde_json::json!({
        "address": owner,
        "hashes": [instance_hash.clone()],
        "reason": serde_json::Value::Null,
        "time": 1_700_000_001.0,
    });
    let (forget_hash, forget_candidate) = inline_candidate(&forget_content, "forget", &owner);
    let row = publisher
        .add_pending_message(&forget_candidate, Utc::now(), MessageOrigin::Api, None, false, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processor.process_one(row.id).await.unwrap(), Some(Outcome::Committed));

    assert!(vms::Entity::find_by_id(instance_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_none());
    assert!(vm_versions::Entity::find_by_id(instance_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_none());
    assert!(messages::Entity::find_by_id(instance_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_none());

    let status = message_status::Entity::find_by_id(instance_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("message_status survives the forget");
    assert_eq!(status.status, MessageStatusKind::Forgotten);

    let tombstone = forgotten_messages::Entity::find_by_id(instance_hash)
        .one(conn.as_ref())
        .await
        .unwrap()
        .expect("forgotten_messages tombstone exists");
    assert_eq!(tombstone.forgotten_by, vec![forget_hash]);
}

/// Scenario 5 (Duplicate pub/sub + tx confirmation): the same logical message
/// admitted first over pub/sub, then again carrying a confirming `tx_hash`,
/// ends up as exactly one `pending_messages` row and one `message_confirmations`
/// row (P1 admission idempotence, P4 confirmation monotonicity).
#[tokio::test]
async fn duplicate_admission_with_later_tx_confirmation_keeps_one_row_and_adds_confirmation() {
    let (db, publisher, _processor) =
        setup("duplicate_admission_with_later_tx_confirmation_keeps_one_row_and_adds_confirmation").await;
    let conn = db.client();

    let content = serde_json::json!({
        "address": "0xowner",
        "key": "k",
        "content": {"a": 1},
        "time": 1_700_000_000.0,
    });
    let (item_hash, candidate) = inline_candidate(&content, "aggregate", "0xowner");

    let first = publisher
        .add_pending_message(&candidate, Utc::now(), MessageOrigin::P2p, None, false, None, None)
        .await
        .unwrap()
        .expect("first admission succeeds");

    let second = publisher
        .add_pending_message(
            &candidate,
            Utc::now(),
            MessageOrigin::OnChain,
            Some("0xtx1"),
            false,
            None,
            None,
        )
        .await
        .unwrap()
        .expect("re-admission under the same logical key still returns the row (P1)");

    assert_eq!(first.id, second.id);
    assert_eq!(first.reception_time, second.reception_time, "P1: reception_time is not clobbered");

    let rows = ccn_entity::pending_messages::Entity::find()
        .all(conn.as_ref())
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.item_hash == item_hash)
        .collect::<Vec<_>>();
    assert_eq!(rows.len(), 1, "exactly one pending_messages row");

    let confirmations = ccn_entity::message_confirmations::Entity::find()
        .all(conn.as_ref())
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.item_hash == item_hash)
        .collect::<Vec<_>>();
    assert_eq!(confirmations.len(), 1, "P4: the tx confirmation is not silently dropped");
    assert_eq!(confirmations[0].tx_hash, "0xtx1");
}

/// Regression coverage for the FK removed from `message_confirmations`: a
/// candidate admitted with `tx_hash` set before any `messages` row exists
/// must still insert cleanly.
#[tokio::test]
async fn tx_confirmed_admission_succeeds_before_the_message_row_exists() {
    let (db, publisher, _processor) =
        setup("tx_confirmed_admission_succeeds_before_the_message_row_exists").await;
    let conn = db.client();

    let content = serde_json::json!({
        "address": "0xowner",
        "ref": serde_json::Value::Null,
        "type": "note",
        "content": {"a": 1},
        "time": 1_700_000_000.0,
    });
    let (item_hash, candidate) = inline_candidate(&content, "post", "0xowner");

    let row = publisher
        .add_pending_message(
            &candidate,
            Utc::now(),
            MessageOrigin::OnChain,
            Some("0xtx1"),
            false,
            None,
            None,
        )
        .await
        .unwrap()
        .expect("tx-confirmed admission succeeds with no prior messages row");

    assert_eq!(row.item_hash, item_hash);
    assert!(messages::Entity::find_by_id(item_hash.clone())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_none(), "commit hasn't run yet");

    let confirmations = ccn_entity::message_confirmations::Entity::find()
        .all(conn.as_ref())
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.item_hash == item_hash)
        .collect::<Vec<_>>();
    assert_eq!(confirmations.len(), 1);
}
