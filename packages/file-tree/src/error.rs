//! Error types for file tree transitions.

use thiserror::Error;

/// Errors that can occur while merging fetch results into the tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The path named the root itself.
    #[error("path must name at least one segment")]
    EmptyPath,

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// An ancestor of the target exists but its listing has not been fetched.
    #[error("cannot update '{path}': ancestor '{ancestor}' is not yet fetched")]
    AncestorNotFetched { path: String, ancestor: String },

    /// An ancestor of the target is absent from its parent's listing.
    #[error("cannot update '{path}': ancestor '{ancestor}' does not exist")]
    MissingAncestor { path: String, ancestor: String },

    /// The metadata source failed to produce a listing.
    #[error("fetching '{path}' failed: {message}")]
    FetchFailed { path: String, message: String },
}

/// Result type alias for file tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
