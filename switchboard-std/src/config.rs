//! Router configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one server process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Id of this process in the fleet. Must be unique across processes
    /// sharing a distributor (default: a fresh UUIDv7).
    pub server_id: String,
}

impl RouterConfig {
    /// Configuration with a fixed process id.
    pub fn with_server_id(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            server_id: uuid::Uuid::now_v7().to_string(),
        }
    }
}
