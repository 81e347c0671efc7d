//! Reducer and shared store for file tree state.
//!
//! ```text
//! fetch(path) ─► FetchStarted ─► source.fetch_metadata(path) ─┬─► FetchDone
//!                                                            └─► FetchFailed
//! ```
//!
//! A failed fetch never changes the tree. The failure is logged and kept per
//! path until a later fetch of that path starts or completes.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Result, TreeError};
use crate::model::FileMetadata;
use crate::path::FilePath;
use crate::tree::FileTree;

/// A state transition for the file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTreeAction {
    FetchStarted {
        path: String,
    },
    FetchDone {
        path: String,
        metadata: FileMetadata,
    },
    FetchFailed {
        path: String,
        error: String,
    },
}

impl FileTreeAction {
    pub fn path(&self) -> &str {
        match self {
            FileTreeAction::FetchStarted { path }
            | FileTreeAction::FetchDone { path, .. }
            | FileTreeAction::FetchFailed { path, .. } => path,
        }
    }
}

/// The tree plus the most recent failure for each path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTreeState {
    pub tree: FileTree,
    pub failures: BTreeMap<FilePath, String>,
}

/// Apply one action to `state`, returning the next state.
///
/// Structural violations are returned as errors and logged; `state` itself is
/// never modified.
pub fn reduce(state: &FileTreeState, action: FileTreeAction) -> Result<FileTreeState> {
    let outcome = apply(state, action.clone());
    if let Err(e) = &outcome {
        tracing::error!(action = ?action, error = %e, "rejected file tree transition");
    }
    outcome
}

fn apply(state: &FileTreeState, action: FileTreeAction) -> Result<FileTreeState> {
    match action {
        FileTreeAction::FetchStarted { path } => {
            let path = FilePath::parse(&path)?;
            let tree = state.tree.fetch_started(&path)?;
            Ok(with_cleared_failure(state, tree, &path))
        }
        FileTreeAction::FetchDone { path, metadata } => {
            let path = FilePath::parse(&path)?;
            let tree = state.tree.fetch_done(&path, metadata)?;
            Ok(with_cleared_failure(state, tree, &path))
        }
        FileTreeAction::FetchFailed { path, error } => {
            let path = FilePath::parse(&path)?;
            tracing::warn!(%path, %error, "file metadata fetch failed");
            let mut failures = state.failures.clone();
            failures.insert(path, error);
            Ok(FileTreeState {
                tree: state.tree.clone(),
                failures,
            })
        }
    }
}

fn with_cleared_failure(state: &FileTreeState, tree: FileTree, path: &FilePath) -> FileTreeState {
    let mut failures = state.failures.clone();
    failures.remove(path);
    FileTreeState { tree, failures }
}

/// Produces metadata listings, typically by asking the engine.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, path: &FilePath) -> std::result::Result<FileMetadata, String>;
}

/// Shared, clonable file tree state.
///
/// Writers serialize on an internal lock; readers take cheap snapshots.
#[derive(Debug, Clone, Default)]
pub struct FileTreeStore {
    state: Arc<RwLock<FileTreeState>>,
}

impl FileTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FileTreeState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FileTreeState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply an action. On error the state is left unchanged.
    pub fn dispatch(&self, action: FileTreeAction) -> Result<()> {
        let mut state = self.write();
        *state = reduce(&state, action)?;
        Ok(())
    }

    /// The current tree.
    pub fn snapshot(&self) -> FileTree {
        self.read().tree.clone()
    }

    /// The current tree and failure record.
    pub fn state(&self) -> FileTreeState {
        self.read().clone()
    }

    /// The recorded failure for `path`, if its last fetch failed.
    pub fn failure(&self, path: &str) -> Option<String> {
        let path = FilePath::parse(path).ok()?;
        self.read().failures.get(&path).cloned()
    }

    /// Discard everything and start over with an unfetched root.
    pub fn reset(&self) {
        tracing::debug!("resetting file tree");
        *self.write() = FileTreeState::default();
    }

    /// Fetch the metadata for `path` from `source` and merge it into the tree.
    pub async fn fetch<S>(&self, source: &S, path: &str) -> Result<FileMetadata>
    where
        S: MetadataSource + ?Sized,
    {
        self.dispatch(FileTreeAction::FetchStarted {
            path: path.to_string(),
        })?;
        let parsed = FilePath::parse(path)?;

        match source.fetch_metadata(&parsed).await {
            Ok(metadata) => {
                self.dispatch(FileTreeAction::FetchDone {
                    path: path.to_string(),
                    metadata: metadata.clone(),
                })?;
                Ok(metadata)
            }
            Err(message) => {
                self.dispatch(FileTreeAction::FetchFailed {
                    path: path.to_string(),
                    error: message.clone(),
                })?;
                Err(TreeError::FetchFailed {
                    path: parsed.to_string(),
                    message,
                })
            }
        }
    }
}
