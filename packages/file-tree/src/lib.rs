//! # semantic-host-file-tree
//!
//! Merges incremental, path-addressed metadata fetches into one consistent
//! file tree.
//!
//! Fetching a path is a three-step protocol: `FetchStarted` creates an
//! unfetched placeholder, then either `FetchDone` stores the listing or
//! `FetchFailed` records the error. A path can only be updated once all of
//! its ancestors below the root have been fetched.
//!
//! ```ignore
//! use semantic_host_file_tree::{FileTreeAction, FileTreeStore};
//!
//! let store = FileTreeStore::new();
//! store.dispatch(FileTreeAction::FetchStarted { path: "/docs".into() })?;
//! store.dispatch(FileTreeAction::FetchDone { path: "/docs".into(), metadata })?;
//!
//! let tree = store.snapshot();
//! let readme = tree.node("/docs/readme.md");
//! ```
//!
//! Trees are immutable and structurally shared: every transition rebuilds
//! only the root-to-leaf path, so snapshots are cheap to hold and compare.

pub mod error;
pub mod model;
pub mod path;
pub mod store;
pub mod tree;

pub use error::{Result, TreeError};
pub use model::{FileMetadata, FileNode, FilePermissions, FileType};
pub use path::FilePath;
pub use store::{reduce, FileTreeAction, FileTreeState, FileTreeStore, MetadataSource};
pub use tree::FileTree;
