//! `smart_contract / v1` payload, grounded on
//! `aleph/schemas/chains/tezos_indexer_response.py::MessageEventPayload`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEventPayload {
    pub timestamp: f64,
    pub addr: String,
    #[serde(rename = "msgtype")]
    pub message_type: String,
    #[serde(rename = "msgcontent")]
    pub message_content: String,
}

pub const STORE_IPFS: &str = "STORE_IPFS";
