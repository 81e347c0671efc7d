//! Host configuration.
//!
//! One JSON document configures every component:
//!
//! ```json
//! {
//!   "scheduler": { "tick_delay": { "secs": 0, "nanos": 0 } },
//!   "transport": { "request_timeout": { "secs": 30, "nanos": 0 } },
//!   "logging": { "filter": "semantic_host=debug" },
//!   "rpc_base_url": "https://engine.example.com/api"
//! }
//! ```
//!
//! Every field is optional and falls back to its default.

use std::path::Path;

use semantic_host_scheduler::SchedulerConfig;
use semantic_host_transport::TransportConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `semantic_host_transport=trace`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration for a [`Host`](crate::Host).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub scheduler: SchedulerConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,

    /// Base URL for engine RPC calls. RPC is unavailable when unset.
    pub rpc_base_url: Option<String>,
}

impl HostConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded host configuration");
        Ok(config)
    }
}
