//! Error types for the transport bridge.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while bridging host transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The fetch handler was rejected with the given message.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// The connection has already been closed or detached.
    #[error("connection closed")]
    Closed,

    /// The handler was released before any outcome reached it.
    #[error("handler released before an outcome was delivered")]
    Canceled,

    /// No tokio runtime was captured or current to run the I/O on.
    #[error("no runtime available to run transport I/O")]
    NoRuntime,

    /// The task driving a connection ended abnormally.
    #[error("connection task failed: {0}")]
    Interrupted(String),
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
