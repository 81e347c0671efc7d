//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration shared by the HTTP and WebSocket adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound for a whole HTTP exchange. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// Upper bound for establishing a connection (TCP + handshake).
    pub connect_timeout: Duration,

    /// User agent sent with HTTP requests and WebSocket handshakes.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
