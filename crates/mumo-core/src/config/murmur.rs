//! Virtual server selection.

use serde::{Deserialize, Serialize};

use crate::types::ServerId;

/// Which virtual servers the moderator attaches to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MurmurConfig {
    /// Servers to moderate. Empty means every booted server.
    #[serde(default, deserialize_with = "super::de::comma_separated")]
    pub servers: Vec<ServerId>,
}

impl MurmurConfig {
    /// Whether callbacks should be attached to `server`.
    pub fn includes(&self, server: ServerId) -> bool {
        self.servers.is_empty() || self.servers.contains(&server)
    }
}
