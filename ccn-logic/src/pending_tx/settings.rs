use serde::Deserialize;

/// Grounded on `process_pending_txs.py`'s worker-count constant; the
/// per-worker `seen_ids` window itself is sized by `RetrySettings::seen_ids_capacity`
/// since both processors share the one duplicate-suppression knob.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PendingTxSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

fn default_concurrency() -> u32 {
    10
}

impl Default for PendingTxSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}
