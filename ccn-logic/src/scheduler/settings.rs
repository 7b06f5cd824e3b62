use serde::Deserialize;

/// Grounded on `process_pending_messages.py`'s retry/backoff constants.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_base_seconds")]
    pub base_seconds: u64,
    #[serde(default = "default_cap_seconds")]
    pub cap_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default = "default_seen_ids_capacity")]
    pub seen_ids_capacity: usize,
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: u64,
}

fn default_base_seconds() -> u64 {
    2
}

fn default_cap_seconds() -> u64 {
    300
}

fn default_max_retries() -> i32 {
    10
}

fn default_seen_ids_capacity() -> usize {
    10_000
}

fn default_high_water_mark() -> u64 {
    100_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_seconds: default_base_seconds(),
            cap_seconds: default_cap_seconds(),
            max_retries: default_max_retries(),
            seen_ids_capacity: default_seen_ids_capacity(),
            high_water_mark: default_high_water_mark(),
        }
    }
}
