use std::collections::HashMap;

use serde::Deserialize;

/// Per-`MessageType` concurrency and scan-loop tuning for the pending-message
/// pipeline (spec §4.4 "Per-type concurrency").
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PendingMessagesSettings {
    /// Default permit count for a type with no entry in `per_type_concurrency`.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    /// Overrides keyed by the lowercase `MessageType` name (`"program"`, `"instance"`, ...).
    #[serde(default)]
    pub per_type_concurrency: HashMap<String, u32>,
    /// How often the periodic scan re-polls `pending_messages` for due rows.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Rows pulled per scan pass.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: u64,
}

fn default_max_concurrency() -> u32 {
    8
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_scan_batch_size() -> u64 {
    200
}

impl Default for PendingMessagesSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            per_type_concurrency: HashMap::new(),
            scan_interval_secs: default_scan_interval_secs(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl PendingMessagesSettings {
    pub fn permits_for(&self, message_type: &ccn_entity::sea_orm_active_enums::MessageType) -> u32 {
        let key = type_key(message_type);
        self.per_type_concurrency
            .get(key)
            .copied()
            .unwrap_or(self.max_concurrency)
    }
}

fn type_key(message_type: &ccn_entity::sea_orm_active_enums::MessageType) -> &'static str {
    use ccn_entity::sea_orm_active_enums::MessageType as T;
    match message_type {
        T::Aggregate => "aggregate",
        T::Post => "post",
        T::Store => "store",
        T::Program => "program",
        T::Instance => "instance",
        T::Forget => "forget",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccn_entity::sea_orm_active_enums::MessageType;

    #[test]
    fn falls_back_to_max_concurrency() {
        let settings = PendingMessagesSettings::default();
        assert_eq!(settings.permits_for(&MessageType::Program), 8);
    }

    #[test]
    fn honors_per_type_override() {
        let mut settings = PendingMessagesSettings::default();
        settings.per_type_concurrency.insert("program".to_string(), 2);
        assert_eq!(settings.permits_for(&MessageType::Program), 2);
        assert_eq!(settings.permits_for(&MessageType::Post), 8);
    }
}
