//! Process-wide configuration (spec.md §12 "Ambient stack"), composed from
//! each crate's own settings struct exactly as the teacher's
//! `da-indexer-server/src/settings.rs` composes `IndexerSettings` alongside
//! the shared server/metrics/tracing/jaeger/database sections.

use blockscout_service_launcher::{
    database::{DatabaseConnectSettings, DatabaseSettings},
    launcher::{ConfigSettings, MetricsSettings, ServerSettings},
    tracing::{JaegerSettings, TracingSettings},
};
use ccn_logic::{
    broker::BrokerSettings, pending_message::PendingMessagesSettings, pending_tx::PendingTxSettings,
    scheduler::RetrySettings, storage::StorageSettings,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
    pub database: DatabaseSettings,

    pub broker: BrokerSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub pending_txs: PendingTxSettings,
    #[serde(default)]
    pub pending_messages: PendingMessagesSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "CCN_NODE";
}

impl Settings {
    pub fn default(database_url: String) -> Self {
        Self {
            server: Default::default(),
            metrics: Default::default(),
            tracing: Default::default(),
            jaeger: Default::default(),
            database: DatabaseSettings {
                connect: DatabaseConnectSettings::Url(database_url),
                create_database: Default::default(),
                run_migrations: Default::default(),
            },
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: 5672,
                vhost: "/".to_string(),
                username: "guest".to_string(),
                password: "guest".to_string(),
                pending_tx_exchange: "pending-tx".to_string(),
                pending_message_exchange: "pending-message".to_string(),
            },
            storage: StorageSettings {
                folder: std::env::temp_dir().join("ccn-node-storage"),
                ipfs: Default::default(),
            },
            pending_txs: Default::default(),
            pending_messages: Default::default(),
            retry: Default::default(),
        }
    }
}
