//! Type Handlers (spec §4.5): per-`MessageType` logic invoked by the
//! Pending-Message Processor pipeline after content fetch, hash check, and
//! signature verification have already passed.
//!
//! Mirrors the teacher's per-protocol `DA` trait dispatch in `indexer.rs`
//! (`Job::Celestia` / `Job::EigenDA` resolved to a boxed trait object at
//! construction time); here `MessageType` resolves to a boxed `TypeHandler`.

pub mod aggregate;
pub mod cost;
pub mod forget;
pub mod post;
pub mod program_instance;
pub mod store;

use async_trait::async_trait;
use ccn_entity::sea_orm_active_enums::{Chain, ItemType, MessageType};
use sea_orm::DatabaseTransaction;
use serde_json::Value;

use crate::errors::ProcessError;

/// Everything about a pending message a handler needs, already fetched and
/// hash/signature-verified by the pipeline (spec §4.4 steps 1-4).
#[derive(Debug, Clone)]
pub struct PendingContext {
    pub item_hash: String,
    pub sender: String,
    pub chain: Chain,
    pub message_type: MessageType,
    pub signature: Option<String>,
    pub item_type: ItemType,
    pub item_content: String,
    pub time: chrono::DateTime<chrono::Utc>,
    pub channel: Option<String>,
}

/// `fetch_related`/`validate`/`commit`/`forget` per spec §4.5. `fetch_related`
/// defaults to a no-op: only `program`/`instance` need to resolve anything
/// beyond the message's own parsed content.
#[async_trait]
pub trait TypeHandler: Send + Sync {
    async fn fetch_related(
        &self,
        _txn: &DatabaseTransaction,
        _ctx: &PendingContext,
        _content: &Value,
    ) -> Result<Value, ProcessError> {
        Ok(Value::Null)
    }

    async fn validate(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        extra: &Value,
    ) -> Result<(), ProcessError>;

    async fn commit(
        &self,
        txn: &DatabaseTransaction,
        ctx: &PendingContext,
        content: &Value,
        extra: &Value,
    ) -> Result<(), ProcessError>;

    /// Called when a `forget` message targets a message this handler owns.
    /// `messages`/`message_status`/`forgotten_messages` bookkeeping is
    /// generic and handled by the `forget` handler itself; this hook is for
    /// type-specific cleanup (e.g. dropping a VM's `vm_versions` pointer).
    async fn forget(&self, txn: &DatabaseTransaction, item_hash: &str) -> Result<(), ProcessError>;
}

pub fn handler_for(message_type: &MessageType) -> Box<dyn TypeHandler> {
    match message_type {
        MessageType::Aggregate => Box::new(aggregate::AggregateHandler),
        MessageType::Post => Box::new(post::PostHandler),
        MessageType::Store => Box::new(store::StoreHandler),
        MessageType::Program => Box::new(program_instance::ProgramInstanceHandler::program()),
        MessageType::Instance => Box::new(program_instance::ProgramInstanceHandler::instance()),
        MessageType::Forget => Box::new(forget::ForgetHandler),
    }
}

/// Runs `fetch_related` then `validate` then `commit` against one
/// transaction, the sequencing spec §4.4 step 5 describes.
pub async fn run_handler(
    handler: &dyn TypeHandler,
    txn: &DatabaseTransaction,
    ctx: &PendingContext,
    content: &Value,
) -> Result<(), ProcessError> {
    let extra = handler.fetch_related(txn, ctx, content).await?;
    handler.validate(txn, ctx, content, &extra).await?;
    handler.commit(txn, ctx, content, &extra).await
}

/// Byte length of the canonical `item_content`, stored as `messages.size`
/// once the pipeline commits a processed message.
pub fn canonical_size(ctx: &PendingContext) -> i64 {
    ctx.item_content.len() as i64
}
