//! Voice server connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the voice server's control interface is and how often to check it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Control interface host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Control interface port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret sent with every request. Empty means none.
    #[serde(default)]
    pub secret: String,
    /// Seconds between connection health checks.
    #[serde(default = "default_watchdog")]
    pub watchdog: u64,
}

impl TransportConfig {
    /// Watchdog period as a [`Duration`].
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog)
    }

    /// `host:port` string used in log output.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret: String::new(),
            watchdog: default_watchdog(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6502
}

fn default_watchdog() -> u64 {
    30
}
