//! Module discovery and lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where modules and their configuration files live, and how long
/// lifecycle operations may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Directory searched for dynamically loadable module libraries.
    #[serde(default = "default_mod_dir")]
    pub mod_dir: String,
    /// Directory holding one configuration file per enabled module.
    #[serde(default = "default_cfg_dir")]
    pub cfg_dir: String,
    /// Seconds to wait for a module thread to finish after stop.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Seconds a blocking manager call may wait. Unset means wait forever.
    #[serde(default)]
    pub call_timeout: Option<u64>,
}

impl ModulesConfig {
    /// Stop/join timeout as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Blocking call timeout as a [`Duration`], if configured.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout.map(Duration::from_secs)
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            mod_dir: default_mod_dir(),
            cfg_dir: default_cfg_dir(),
            timeout: default_timeout(),
            call_timeout: None,
        }
    }
}

fn default_mod_dir() -> String {
    "modules/".to_string()
}

fn default_cfg_dir() -> String {
    "modules-enabled/".to_string()
}

fn default_timeout() -> u64 {
    2
}
