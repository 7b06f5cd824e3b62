use serde::Deserialize;

/// Grounded on `aleph/config.py`'s `p2p`/`rabbitmq` section, renamed to match
/// this crate's broker abstraction.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BrokerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_vhost")]
    pub vhost: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_pending_tx_exchange")]
    pub pending_tx_exchange: String,
    #[serde(default = "default_pending_message_exchange")]
    pub pending_message_exchange: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_pending_tx_exchange() -> String {
    "pending-tx".to_string()
}

fn default_pending_message_exchange() -> String {
    "pending-message".to_string()
}

impl BrokerSettings {
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.username,
            self.password,
            self.host,
            self.port,
            self.vhost.trim_start_matches('/')
        )
    }
}
