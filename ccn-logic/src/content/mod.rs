//! Tagged-sum message content (spec §9 "Dynamic typing & polymorphic content").
//!
//! The wire form is a dynamically-typed JSON object whose shape depends on
//! `type`. Rather than carry that dynamism through the whole pipeline, we parse
//! it once into one of these variants while keeping the original `Value` around
//! (`Message.content` in `ccn-entity`) for forward compatibility with fields a
//! given node version doesn't know about yet.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccn_entity::sea_orm_active_enums::MessageType;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("failed to parse {message_type} content: {source}")]
    Malformed {
        message_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub enum MessageContent {
    Aggregate(AggregateContent),
    Post(PostContent),
    Store(StoreContent),
    Program(ProgramContent),
    Instance(InstanceContent),
    Forget(ForgetContent),
}

impl MessageContent {
    /// Parses `raw` according to `message_type`, the single dispatch point
    /// spec §9 calls for.
    pub fn parse(message_type: &MessageType, raw: &serde_json::Value) -> Result<Self, ContentError> {
        match message_type {
            MessageType::Aggregate => Ok(Self::Aggregate(parse("aggregate", raw)?)),
            MessageType::Post => Ok(Self::Post(parse("post", raw)?)),
            MessageType::Store => Ok(Self::Store(parse("store", raw)?)),
            MessageType::Program => Ok(Self::Program(parse("program", raw)?)),
            MessageType::Instance => Ok(Self::Instance(parse("instance", raw)?)),
            MessageType::Forget => Ok(Self::Forget(parse("forget", raw)?)),
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(
    message_type: &'static str,
    raw: &serde_json::Value,
) -> Result<T, ContentError> {
    serde_json::from_value(raw.clone()).map_err(|source| ContentError::Malformed {
        message_type,
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateContent {
    pub address: String,
    pub key: String,
    pub content: serde_json::Value,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContent {
    pub address: String,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub content: serde_json::Value,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreContent {
    pub address: String,
    pub time: f64,
    pub item_type: String,
    pub item_hash: String,
}

/// A reference to a `StoredFile`, either pinned by an exact `item_hash` or
/// dereferenced through a mutable `file_tags` row (§4.5, grounded on
/// `cost.py::_get_file_from_ref`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub use_latest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "persistence", rename_all = "lowercase")]
pub enum Volume {
    Immutable {
        #[serde(rename = "ref")]
        reference: String,
        #[serde(default)]
        use_latest: bool,
        mount: Option<String>,
    },
    Ephemeral {
        size_mib: u64,
        mount: Option<String>,
    },
    Host {
        size_mib: u64,
        mount: Option<String>,
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rootfs {
    pub parent: VolumeRef,
    pub size_mib: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramContent {
    pub owner: String,
    pub code: VolumeRef,
    pub runtime: VolumeRef,
    pub data: Option<VolumeRef>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceContent {
    pub owner: String,
    pub rootfs: Rootfs,
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgetContent {
    pub address: String,
    pub hashes: Vec<String>,
    pub reason: Option<String>,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_instance_content_with_five_volumes() {
        let raw = serde_json::json!({
            "owner": "0xabc",
            "rootfs": {"parent": {"ref": "549ec4", "use_latest": false}, "size_mib": 2000},
            "volumes": [
                {"persistence": "ephemeral", "size_mib": 100, "mount": "/tmp"},
                {"persistence": "host", "size_mib": 100, "mount": "/a", "name": "a"},
                {"persistence": "host", "size_mib": 100, "mount": "/b", "name": "b"},
                {"persistence": "host", "size_mib": 100, "mount": "/c", "name": "c"},
                {"persistence": "immutable", "ref": "abc123", "use_latest": true, "mount": "/d"},
            ],
        });
        let content = MessageContent::parse(&MessageType::Instance, &raw).unwrap();
        match content {
            MessageContent::Instance(instance) => assert_eq!(instance.volumes.len(), 5),
            _ => panic!("expected instance content"),
        }
    }

    #[test]
    fn rejects_forget_content_missing_hashes() {
        let raw = serde_json::json!({"address": "0xabc", "time": 1.0});
        let err = MessageContent::parse(&MessageType::Forget, &raw).unwrap_err();
        assert!(matches!(err, ContentError::Malformed { .. }));
    }
}
