use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ON_CHAIN_SYNC_PROTOCOL: &str = "aleph-sync";
pub const OFF_CHAIN_SYNC_PROTOCOL: &str = "aleph-offchain-sync";

/// The wire envelope from spec §6 "Sync envelope (on-chain/off-chain)". `content`
/// is either an inline `{"messages": [...]}` object or a bare content hash string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncEnvelope {
    pub protocol: String,
    pub version: u32,
    pub content: EnvelopeContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnvelopeContent {
    Inline { messages: Vec<Value> },
    Hash(String),
}
