//! Error types for the handle protocol.

use thiserror::Error;

use crate::handle::HandleId;

/// Errors raised when a handle is used outside of its lifetime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The slot no longer holds its handle; it was released or detached.
    #[error("handle {0} was already released")]
    Released(HandleId),
}

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, HandleError>;
