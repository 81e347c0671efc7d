//! Error types for the scheduler.

use semantic_host_handle::HandleId;
use thiserror::Error;

/// Errors that can occur while driving work units.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No tokio runtime is available to drive ticks on.
    #[error("no host event loop available: {0}")]
    NoRuntime(String),

    /// A work unit panicked during a tick. Its handle was leaked.
    #[error("work unit {id} panicked: {message}")]
    WorkUnitPanicked { id: HandleId, message: String },

    /// The task driving a work unit ended without reporting an outcome.
    #[error("work unit {id} was not driven to completion: {message}")]
    Interrupted { id: HandleId, message: String },
}

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
