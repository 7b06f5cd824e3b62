//! Shared enum columns used across the CCN core tables.

use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "chain_sync_protocol")]
pub enum ChainSyncProtocol {
    #[sea_orm(string_value = "on_chain_sync")]
    OnChainSync,
    #[sea_orm(string_value = "off_chain_sync")]
    OffChainSync,
    #[sea_orm(string_value = "smart_contract")]
    SmartContract,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "chain")]
pub enum Chain {
    #[sea_orm(string_value = "ethereum")]
    Ethereum,
    #[sea_orm(string_value = "solana")]
    Solana,
    #[sea_orm(string_value = "tezos")]
    Tezos,
    #[sea_orm(string_value = "bsc")]
    Bsc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "message_type")]
pub enum MessageType {
    #[sea_orm(string_value = "aggregate")]
    Aggregate,
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "store")]
    Store,
    #[sea_orm(string_value = "program")]
    Program,
    #[sea_orm(string_value = "instance")]
    Instance,
    #[sea_orm(string_value = "forget")]
    Forget,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "item_type")]
pub enum ItemType {
    #[sea_orm(string_value = "inline")]
    Inline,
    #[sea_orm(string_value = "storage")]
    Storage,
    #[sea_orm(string_value = "ipfs")]
    Ipfs,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "message_status")]
pub enum MessageStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processed")]
    Processed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "forgotten")]
    Forgotten,
    #[sea_orm(string_value = "removing")]
    Removing,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "message_origin")]
pub enum MessageOrigin {
    #[sea_orm(string_value = "p2p")]
    P2p,
    #[sea_orm(string_value = "onchain")]
    OnChain,
    #[sea_orm(string_value = "api")]
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "file_type")]
pub enum FileType {
    #[sea_orm(string_value = "file")]
    File,
    #[sea_orm(string_value = "directory")]
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "pin_type")]
pub enum PinType {
    #[sea_orm(string_value = "tx")]
    Tx,
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "tag")]
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "vm_type")]
pub enum VmType {
    #[sea_orm(string_value = "program")]
    Program,
    #[sea_orm(string_value = "instance")]
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "volume_kind")]
pub enum VolumeKind {
    #[sea_orm(string_value = "ephemeral")]
    Ephemeral,
    #[sea_orm(string_value = "persistent")]
    Persistent,
    #[sea_orm(string_value = "immutable")]
    Immutable,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer", enum_name = "error_code")]
pub enum ErrorCode {
    #[sea_orm(num_value = 1)]
    InvalidFormat,
    #[sea_orm(num_value = 2)]
    ContentHashMismatch,
    #[sea_orm(num_value = 3)]
    InvalidSignature,
    #[sea_orm(num_value = 4)]
    ContentValidationFailed,
    #[sea_orm(num_value = 5)]
    VmVolumeNotFound,
    #[sea_orm(num_value = 6)]
    PermissionDenied,
    #[sea_orm(num_value = 7)]
    ExceededAmtOfRetries,
    #[sea_orm(num_value = 8)]
    InternalError,
}
