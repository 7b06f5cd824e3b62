//! Scheduler / Retry Controller (spec §4.6): backoff timing, the
//! duplicate-suppression LRU, and the high-water-mark cleanup sweep.

pub mod settings;

use std::time::Duration;

use ccn_entity::{pending_messages, sea_orm_active_enums::Chain};
use lru::LruCache;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

pub use settings::RetrySettings;

/// The dedup identity of a pending message (spec Glossary). Distinct from
/// `pending_messages.dedup_key` (a sha256 byte string, the SQL conflict
/// target): this is the in-process, hashable counterpart used by the
/// duplicate-suppression LRU and the in-flight `processing_messages` guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalKey {
    pub item_hash: String,
    pub sender: String,
    pub source_chain: Option<Chain>,
    pub source_height: Option<i64>,
}

impl LogicalKey {
    pub fn new(
        item_hash: impl Into<String>,
        sender: impl Into<String>,
        source_chain: Option<Chain>,
        source_height: Option<i64>,
    ) -> Self {
        Self {
            item_hash: item_hash.into(),
            sender: sender.into(),
            source_chain,
            source_height,
        }
    }

    pub fn from_pending(model: &pending_messages::Model) -> Self {
        Self::new(
            model.item_hash.clone(),
            model.sender.clone(),
            model.source_chain.clone(),
            model.source_height,
        )
    }
}

/// `backoff(k) = min(base * 2^k, cap)`.
pub fn backoff(settings: &RetrySettings, retries: i32) -> Duration {
    let exponent = retries.max(0).min(32) as u32;
    let scaled = settings.base_seconds.saturating_mul(1u64 << exponent);
    Duration::from_secs(scaled.min(settings.cap_seconds))
}

/// Bounded LRU of recently-admitted logical keys, to avoid re-processing a
/// tx's messages moments after pub/sub already delivered them (spec §4.6).
/// Per-worker, never shared across processes (spec §5 "Shared resources").
pub struct SeenIdsWindow {
    cache: Mutex<LruCache<LogicalKey, ()>>,
}

impl SeenIdsWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
            )),
        }
    }

    /// Returns `true` if `key` was already in the window (and refreshes its
    /// recency), inserting it if not.
    pub async fn seen_or_insert(&self, key: LogicalKey) -> bool {
        let mut cache = self.cache.lock().await;
        if cache.get(&key).is_some() {
            true
        } else {
            cache.put(key, ());
            false
        }
    }
}

/// Best-effort sweep: when the table exceeds `high_water_mark`, delete
/// `pending_messages` rows that share a logical key with another row of
/// higher `source_height` (spec §4.6, implementing invariant I3).
pub async fn sweep_duplicates<C: ConnectionTrait>(
    db: &C,
    high_water_mark: u64,
) -> Result<u64, sea_orm::DbErr> {
    let total = pending_messages::Entity::find().count(db).await?;
    if total <= high_water_mark {
        return Ok(0);
    }

    let rows = pending_messages::Entity::find().all(db).await?;
    let mut best_height: std::collections::HashMap<LogicalKey, i64> = std::collections::HashMap::new();
    for row in &rows {
        let key = LogicalKey::from_pending(row);
        let height = row.source_height.unwrap_or(i64::MIN);
        best_height
            .entry(key)
            .and_modify(|h| *h = (*h).max(height))
            .or_insert(height);
    }

    let mut stale_ids = Vec::new();
    for row in &rows {
        let key = LogicalKey::from_pending(row);
        let height = row.source_height.unwrap_or(i64::MIN);
        if best_height.get(&key).copied().unwrap_or(height) > height {
            stale_ids.push(row.id);
        }
    }

    if stale_ids.is_empty() {
        return Ok(0);
    }

    let result = pending_messages::Entity::delete_many()
        .filter(pending_messages::Column::Id.is_in(stale_ids.clone()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let settings = RetrySettings::default();
        assert_eq!(backoff(&settings, 0), Duration::from_secs(2));
        assert_eq!(backoff(&settings, 1), Duration::from_secs(4));
        assert_eq!(backoff(&settings, 10), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn seen_ids_window_flags_repeats() {
        let window = SeenIdsWindow::new(2);
        let key = LogicalKey::new("h1", "s1", None, None);
        assert!(!window.seen_or_insert(key.clone()).await);
        assert!(window.seen_or_insert(key).await);
    }
}
