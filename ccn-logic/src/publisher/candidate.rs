//! Wire-form candidate parsing and well-formedness checks (spec §4.3 steps 1-2).

use ccn_entity::sea_orm_active_enums::{Chain, ItemType, MessageType};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::chain_data::INCOMING_MESSAGE_AUTHORIZED_FIELDS;

/// Only the fields in `INCOMING_MESSAGE_AUTHORIZED_FIELDS` are read; anything
/// else on the incoming JSON object is silently dropped (serde ignores
/// unknown fields by default when the struct has no `deny_unknown_fields`).
#[derive(Debug, Deserialize)]
struct RawCandidate {
    item_hash: Option<String>,
    item_content: Option<String>,
    item_type: Option<String>,
    chain: Option<String>,
    channel: Option<String>,
    sender: Option<String>,
    #[serde(rename = "type")]
    message_type: Option<String>,
    time: Option<f64>,
    signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub item_hash: String,
    pub item_content: Option<String>,
    pub item_type: ItemType,
    pub chain: Chain,
    pub channel: Option<String>,
    pub sender: String,
    pub message_type: MessageType,
    pub time: DateTime<Utc>,
    pub signature: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    #[error("missing or empty item_hash")]
    MissingItemHash,
    #[error("missing sender")]
    MissingSender,
    #[error("invalid time: {0:?}")]
    InvalidTime(Option<f64>),
    #[error("invalid chain: {0:?}")]
    InvalidChain(Option<String>),
    #[error("invalid type: {0:?}")]
    InvalidType(Option<String>),
    #[error("invalid item_type: {0:?}")]
    InvalidItemType(Option<String>),
}

impl Candidate {
    /// Drops any field not in `INCOMING_MESSAGE_AUTHORIZED_FIELDS`, then
    /// checks the well-formedness rules in spec §4.3 step 2. `item_hash` is
    /// validated last among field-order but reported first: it is needed to
    /// key any `RejectedMessage` row the caller writes for this failure.
    pub fn parse(message_dict: &Value) -> Result<Self, CandidateError> {
        let raw: RawCandidate = serde_json::from_value(message_dict.clone())
            .unwrap_or(RawCandidate {
                item_hash: None,
                item_content: None,
                item_type: None,
                chain: None,
                channel: None,
                sender: None,
                message_type: None,
                time: None,
                signature: None,
            });
        let _ = INCOMING_MESSAGE_AUTHORIZED_FIELDS; // documents the allowlist this mirrors

        let item_hash = raw
            .item_hash
            .filter(|s| !s.is_empty())
            .ok_or(CandidateError::MissingItemHash)?;
        let sender = raw.sender.filter(|s| !s.is_empty()).ok_or(CandidateError::MissingSender)?;

        let time = raw
            .time
            .filter(|t| t.is_finite())
            .and_then(|t| Utc.timestamp_millis_opt((t * 1000.0) as i64).single())
            .ok_or(CandidateError::InvalidTime(raw.time))?;

        let chain = parse_chain(raw.chain.as_deref())
            .ok_or_else(|| CandidateError::InvalidChain(raw.chain.clone()))?;
        let message_type = parse_message_type(raw.message_type.as_deref())
            .ok_or_else(|| CandidateError::InvalidType(raw.message_type.clone()))?;
        let item_type = parse_item_type(raw.item_type.as_deref())
            .ok_or_else(|| CandidateError::InvalidItemType(raw.item_type.clone()))?;

        Ok(Candidate {
            item_hash,
            item_content: raw.item_content,
            item_type,
            chain,
            channel: raw.channel,
            sender,
            message_type,
            time,
            signature: raw.signature,
        })
    }
}

fn parse_chain(value: Option<&str>) -> Option<Chain> {
    match value? {
        "ethereum" => Some(Chain::Ethereum),
        "solana" => Some(Chain::Solana),
        "tezos" => Some(Chain::Tezos),
        "bsc" => Some(Chain::Bsc),
        _ => None,
    }
}

fn parse_message_type(value: Option<&str>) -> Option<MessageType> {
    match value? {
        "aggregate" => Some(MessageType::Aggregate),
        "post" => Some(MessageType::Post),
        "store" => Some(MessageType::Store),
        "program" => Some(MessageType::Program),
        "instance" => Some(MessageType::Instance),
        "forget" => Some(MessageType::Forget),
        _ => None,
    }
}

fn parse_item_type(value: Option<&str>) -> Option<ItemType> {
    match value? {
        "inline" => Some(ItemType::Inline),
        "storage" => Some(ItemType::Storage),
        "ipfs" => Some(ItemType::Ipfs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_candidate() {
        let value = serde_json::json!({
            "item_hash": "abc123",
            "sender": "0xabc",
            "chain": "ethereum",
            "type": "post",
            "item_type": "inline",
            "time": 1700000000.0,
            "extra_unknown_field": "dropped",
        });
        let candidate = Candidate::parse(&value).unwrap();
        assert_eq!(candidate.item_hash, "abc123");
        assert_eq!(candidate.chain, Chain::Ethereum);
    }

    #[test]
    fn rejects_missing_item_hash() {
        let value = serde_json::json!({"sender": "0xabc", "chain": "ethereum", "type": "post", "item_type": "inline", "time": 1.0});
        assert!(matches!(
            Candidate::parse(&value).unwrap_err(),
            CandidateError::MissingItemHash
        ));
    }

    #[test]
    fn rejects_unknown_chain() {
        let value = serde_json::json!({"item_hash": "a", "sender": "0xabc", "chain": "dogecoin", "type": "post", "item_type": "inline", "time": 1.0});
        assert!(matches!(
            Candidate::parse(&value).unwrap_err(),
            CandidateError::InvalidChain(_)
        ));
    }
}
