//! Copy-on-write tree transitions.
//!
//! Every transition returns a new [`FileTree`]. Only the nodes on the
//! root-to-leaf path are rebuilt; siblings and unrelated subtrees are shared
//! with the previous tree by `Arc`, so readers holding an older snapshot are
//! never disturbed.
//!
//! The root starts out unfetched. It is never fetched itself, so the first
//! top-level transition gives it an implicit empty directory listing. Every
//! other ancestor must already carry metadata before a descendant can be
//! updated.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Result, TreeError};
use crate::model::{FileMetadata, FileNode};
use crate::path::FilePath;

/// A snapshot of the merged file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTree {
    root: Arc<FileNode>,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

enum Leaf {
    Placeholder,
    Fetched(FileMetadata),
}

impl FileTree {
    /// A tree holding only the unfetched root.
    pub fn new() -> Self {
        Self {
            root: Arc::new(FileNode::placeholder("")),
        }
    }

    pub fn root(&self) -> &Arc<FileNode> {
        &self.root
    }

    /// Look up the node at `path`. `""` and `"/"` name the root.
    pub fn node(&self, path: &str) -> Option<&Arc<FileNode>> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        if trimmed.is_empty() {
            return Some(&self.root);
        }
        trimmed
            .split('/')
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    /// Record that a fetch for `path` has begun.
    ///
    /// Creates an unfetched leaf if none exists. An existing leaf is kept as
    /// is, so its previous metadata stays visible until the fetch completes.
    pub fn fetch_started(&self, path: &FilePath) -> Result<FileTree> {
        self.apply(path, Leaf::Placeholder)
    }

    /// Store the metadata fetched for `path`, replacing whatever was known
    /// about that node and its subtree.
    pub fn fetch_done(&self, path: &FilePath, metadata: FileMetadata) -> Result<FileTree> {
        self.apply(path, Leaf::Fetched(metadata))
    }

    fn apply(&self, path: &FilePath, leaf: Leaf) -> Result<FileTree> {
        match rebuild(&self.root, path, 0, leaf)? {
            Some(root) => Ok(FileTree {
                root: Arc::new(root),
            }),
            None => Ok(self.clone()),
        }
    }
}

/// Rebuild `node` (the ancestor at `depth`) with the leaf update applied.
///
/// Returns `None` when the update leaves the tree unchanged.
fn rebuild(node: &FileNode, path: &FilePath, depth: usize, leaf: Leaf) -> Result<Option<FileNode>> {
    let name = &path.segments()[depth];
    let is_leaf = depth + 1 == path.depth();

    let listing = match &node.metadata {
        Some(metadata) => Cow::Borrowed(metadata),
        None if depth == 0 => Cow::Owned(FileMetadata::directory()),
        None => {
            return Err(TreeError::AncestorNotFetched {
                path: path.to_string(),
                ancestor: path.prefix(depth),
            })
        }
    };
    let index = listing.children.iter().position(|c| c.name == *name);

    let child = if is_leaf {
        match (index, leaf) {
            (Some(_), Leaf::Placeholder) => return Ok(None),
            (None, Leaf::Placeholder) => FileNode::placeholder(name.as_str()),
            (_, Leaf::Fetched(metadata)) => FileNode::fetched(name.as_str(), metadata),
        }
    } else {
        let existing = match index {
            Some(i) => &listing.children[i],
            None => {
                return Err(TreeError::MissingAncestor {
                    path: path.to_string(),
                    ancestor: path.prefix(depth + 1),
                })
            }
        };
        match rebuild(existing, path, depth + 1, leaf)? {
            Some(child) => child,
            None => return Ok(None),
        }
    };

    let mut listing = listing.into_owned();
    match index {
        Some(i) => listing.children[i] = Arc::new(child),
        None => listing.children.push(Arc::new(child)),
    }
    Ok(Some(FileNode {
        name: node.name.clone(),
        metadata: Some(listing),
    }))
}
