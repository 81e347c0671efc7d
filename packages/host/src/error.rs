//! Error types for the host bridge.

use std::sync::Arc;

use semantic_host_file_tree::TreeError;
use semantic_host_scheduler::SchedulerError;
use semantic_host_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the host bridge.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid log filter '{filter}': {message}")]
    LogFilter { filter: String, message: String },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Engine construction failed; every waiter observes the same error.
    #[error("engine initialization failed: {0}")]
    EngineInit(Arc<HostError>),

    /// The engine was constructed from a message-only failure.
    #[error("{0}")]
    Engine(String),

    #[error("no RPC base URL configured")]
    NoRpcBaseUrl,
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
