use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::serde_as;

/// Grounded on `aleph/config.py`'s `storage`/`ipfs` sections.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// Root directory of the local content-addressed engine.
    pub folder: PathBuf,
    #[serde(default)]
    pub ipfs: IpfsSettings,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IpfsSettings {
    #[serde(default = "default_ipfs_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ipfs_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
    #[serde(default = "default_fetch_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_pin_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub pin_timeout: Duration,
}

fn default_ipfs_enabled() -> bool {
    true
}

fn default_ipfs_gateway_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_request_retries() -> u32 {
    3
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_pin_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for IpfsSettings {
    fn default() -> Self {
        Self {
            enabled: default_ipfs_enabled(),
            gateway_url: default_ipfs_gateway_url(),
            request_retries: default_request_retries(),
            fetch_timeout: default_fetch_timeout(),
            pin_timeout: default_pin_timeout(),
        }
    }
}
