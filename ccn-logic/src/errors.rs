use thiserror::Error;

use crate::content::ContentError;

/// Reasons the Chain Data Service refuses to turn a `ChainTx` into candidate messages.
#[derive(Debug, Error)]
pub enum ChainDataError {
    #[error("bad data in tx {chain}/{hash}: {reason}")]
    InvalidContent {
        chain: String,
        hash: String,
        reason: String,
    },
    #[error("content for tx {chain}/{hash} is currently unavailable: {0}", reason)]
    ContentUnavailable {
        chain: String,
        hash: String,
        reason: String,
    },
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

/// `ErrorCode` enum values as a typed counterpart to `ccn_entity::sea_orm_active_enums::ErrorCode`,
/// used by components that compute a rejection reason before they have a DB connection at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidFormat,
    ContentHashMismatch,
    InvalidSignature,
    ContentValidationFailed,
    VmVolumeNotFound,
    PermissionDenied,
    ExceededAmtOfRetries,
    InternalError,
}

impl From<ErrorCode> for ccn_entity::sea_orm_active_enums::ErrorCode {
    fn from(code: ErrorCode) -> Self {
        use ccn_entity::sea_orm_active_enums::ErrorCode as E;
        match code {
            ErrorCode::InvalidFormat => E::InvalidFormat,
            ErrorCode::ContentHashMismatch => E::ContentHashMismatch,
            ErrorCode::InvalidSignature => E::InvalidSignature,
            ErrorCode::ContentValidationFailed => E::ContentValidationFailed,
            ErrorCode::VmVolumeNotFound => E::VmVolumeNotFound,
            ErrorCode::PermissionDenied => E::PermissionDenied,
            ErrorCode::ExceededAmtOfRetries => E::ExceededAmtOfRetries,
            ErrorCode::InternalError => E::InternalError,
        }
    }
}

/// Outcome of handing a message to its type handler or to the fetch/verify steps
/// ahead of it (spec §4.4 steps 2-5).
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("rejected: {code:?}: {message}")]
    Rejected {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("transient failure, retry later: {0}")]
    RetryLater(String),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

impl ProcessError {
    pub fn rejected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn rejected_with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
            details: Some(details),
        }
    }
}

impl From<ContentError> for ProcessError {
    fn from(err: ContentError) -> Self {
        ProcessError::rejected(ErrorCode::ContentValidationFailed, err.to_string())
    }
}

/// Why the admission gate refused a candidate outright (spec §4.3 step 2).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("malformed candidate: {0}")]
    InvalidFormat(String),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

/// Signature verification failures (spec §4.4 step 3).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unsupported chain for signature verification: {0:?}")]
    UnsupportedChain(ccn_entity::sea_orm_active_enums::Chain),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("malformed sender address: {0}")]
    MalformedSender(String),
    #[error("signature does not match sender")]
    Mismatch,
}

/// Content-addressed fetch outcomes, used instead of exceptions-as-control-flow
/// (spec §9 "Exception-for-control-flow on storage retries").
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local storage engine error: {0}")]
    Engine(String),
    #[error("ipfs client error: {0}")]
    Ipfs(#[from] reqwest_middleware::Error),
}

/// Failures `handle_pending_tx` can hit (spec §4.2). `ContentUnavailable`
/// is the one variant that means "leave `PendingTx` in place, redelivery
/// will retry" rather than a permanent condition.
#[derive(Debug, Error)]
pub enum PendingTxError {
    #[error("content for this tx is currently unavailable, will retry on redelivery")]
    ContentUnavailable,
    #[error("invalid chain data: {0}")]
    InvalidContent(String),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

impl From<ChainDataError> for PendingTxError {
    fn from(err: ChainDataError) -> Self {
        match err {
            ChainDataError::ContentUnavailable { .. } => PendingTxError::ContentUnavailable,
            ChainDataError::InvalidContent { .. } => PendingTxError::InvalidContent(err.to_string()),
            ChainDataError::Db(e) => PendingTxError::Db(e),
        }
    }
}
