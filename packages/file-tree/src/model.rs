//! File listing types delivered by the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePermissions {
    pub readonly: bool,
}

/// Everything known about one fetched path.
///
/// `children` is the listing fetched for exactly this path. Child nodes may
/// themselves be unfetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub children: Vec<Arc<FileNode>>,
    pub file_type: FileType,
    pub size: u64,
    pub permissions: FilePermissions,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl FileMetadata {
    /// Metadata of an empty directory with epoch timestamps.
    pub fn directory() -> Self {
        Self {
            children: Vec::new(),
            file_type: FileType::Dir,
            size: 0,
            permissions: FilePermissions::default(),
            modified: DateTime::<Utc>::default(),
            accessed: DateTime::<Utc>::default(),
            created: DateTime::<Utc>::default(),
        }
    }

    /// Replace the child listing.
    pub fn with_children(mut self, children: impl IntoIterator<Item = FileNode>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Dir
    }
}

/// One named entry in the tree.
///
/// A node without metadata is structurally present but not yet fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub metadata: Option<FileMetadata>,
}

impl FileNode {
    /// A node whose metadata has not been fetched.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
        }
    }

    pub fn fetched(name: impl Into<String>, metadata: FileMetadata) -> Self {
        Self {
            name: name.into(),
            metadata: Some(metadata),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.metadata.is_some()
    }

    /// The fetched child listing. Empty for unfetched nodes.
    pub fn children(&self) -> &[Arc<FileNode>] {
        match &self.metadata {
            Some(metadata) => &metadata.children,
            None => &[],
        }
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Arc<FileNode>> {
        self.children().iter().find(|c| c.name == name)
    }
}
