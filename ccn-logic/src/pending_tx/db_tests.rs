//! `TestDbGuard`-backed coverage of the off-chain sync indirection path
//! (scenario 4): a `pending_tx` carrying an `off_chain_sync` `ChainTx`
//! expands through storage into a bundle of messages, all of which get
//! admitted and confirmed, and the `pending_tx` row is deleted once done.

use std::{num::NonZeroUsize, sync::Arc};

use blockscout_service_launcher::test_database::TestDbGuard;
use ccn_entity::{chain_txs, message_confirmations, pending_txs, sea_orm_active_enums::ChainSyncProtocol};
use chrono::Utc;
use lru::LruCache;
use migration::Migrator;
use sea_orm::{ActiveModelTrait, EntityTrait};

use crate::{
    chain_data::ChainDataService,
    pending_tx::PendingTxProcessor,
    publisher::MessagePublisher,
    storage::{
        settings::{IpfsSettings, StorageSettings},
        StorageEngine, StorageService,
    },
};

struct FixedEngine {
    hash: String,
    bytes: Vec<u8>,
}

#[async_trait::async_trait]
impl StorageEngine for FixedEngine {
    async fn read(&self, hash: &str) -> std::io::Result<Option<Vec<u8>>> {
        Ok((hash == self.hash).then(|| self.bytes.clone()))
    }
    async fn write(&self, _hash: &str, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn off_chain_sync_bundle_admits_both_messages_and_deletes_pending_tx() {
    let db = TestDbGuard::new::<Migrator>("off_chain_sync_bundle_admits_both_messages_and_deletes_pending_tx").await;
    let conn = db.client();

    let bundle_hash = "bundle1".to_string();
    let bundle = serde_json::json!({
        "messages": [
            {
                "item_hash": "m1",
                "sender": "0xowner",
                "chain": "ethereum",
                "type": "post",
                "item_type": "inline",
                "time": 1_700_000_000.0,
                "item_content": "{\"address\":\"0xowner\",\"ref\":null,\"type\":\"note\",\"content\":{},\"time\":1700000000.0}",
            },
            {
                "item_hash": "m2",
                "sender": "0xowner",
                "chain": "ethereum",
                "type": "post",
                "item_type": "inline",
                "time": 1_700_000_001.0,
                "item_content": "{\"address\":\"0xowner\",\"ref\":null,\"type\":\"note\",\"content\":{},\"time\":1700000001.0}",
            },
        ]
    });
    let bytes = serde_json::to_vec(&bundle).unwrap();
    let storage = StorageService::new(
        Arc::new(FixedEngine {
            hash: bundle_hash.clone(),
            bytes,
        }),
        &StorageSettings {
            folder: "/tmp/ccn-pending-tx-db-tests".into(),
            ipfs: IpfsSettings {
                enabled: false,
                ..Default::default()
            },
        },
    );

    chain_txs::ActiveModel {
        hash: sea_orm::ActiveValue::Set("tx1".to_string()),
        chain: sea_orm::ActiveValue::Set(ccn_entity::sea_orm_active_enums::Chain::Ethereum),
        height: sea_orm::ActiveValue::Set(1),
        datetime: sea_orm::ActiveValue::Set(Utc::now().into()),
        protocol: sea_orm::ActiveValue::Set(ChainSyncProtocol::OffChainSync),
        protocol_version: sea_orm::ActiveValue::Set(1),
        content: sea_orm::ActiveValue::Set(serde_json::Value::String(bundle_hash.clone())),
    }
    .insert(conn.as_ref())
    .await
    .unwrap();

    pending_txs::ActiveModel {
        tx_hash: sea_orm::ActiveValue::Set("tx1".to_string()),
        creation_time: sea_orm::ActiveValue::Set(Utc::now().into()),
    }
    .insert(conn.as_ref())
    .await
    .unwrap();

    let chain_data = ChainDataService::new(storage);
    let publisher = MessagePublisher::new(conn.as_ref().clone(), None);
    let processor = PendingTxProcessor::new(conn.as_ref().clone(), chain_data, publisher, 10_000);

    let mut seen_ids = LruCache::new(NonZeroUsize::new(10_000).unwrap());
    let acked = processor.handle_pending_tx("tx1", &mut seen_ids).await.unwrap();
    assert!(acked);

    assert!(pending_txs::Entity::find_by_id("tx1".to_string())
        .one(conn.as_ref())
        .await
        .unwrap()
        .is_none());

    for item_hash in ["m1", "m2"] {
        let confirmations = message_confirmations::Entity::find()
            .all(conn.as_ref())
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.item_hash == item_hash && c.tx_hash == "tx1")
            .count();
        assert_eq!(confirmations, 1, "{item_hash} got a confirmation against tx1");

        let pending = ccn_entity::pending_messages::Entity::find()
            .all(conn.as_ref())
            .await
            .unwrap()
            .into_iter()
            .any(|r| r.item_hash == item_hash);
        assert!(pending, "{item_hash} was admitted as a pending message");
    }

    assert!(
        seen_ids.contains(&bundle_hash),
        "the bundle hash is marked seen only after a successful expansion"
    );
}
