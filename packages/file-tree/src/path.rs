//! Slash-separated tree paths.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TreeError};

/// A non-root path into the file tree.
///
/// One leading `/` is optional, so `/docs/a.md` and `docs/a.md` name the same
/// node. The root itself is not a valid `FilePath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath {
    segments: Vec<String>,
}

impl FilePath {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        if trimmed.is_empty() {
            return Err(TreeError::EmptyPath);
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TreeError::InvalidPath {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least one.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Render the first `len` segments as a path.
    pub fn prefix(&self, len: usize) -> String {
        let mut out = String::new();
        for segment in self.segments.iter().take(len) {
            out.push('/');
            out.push_str(segment);
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.segments.len()))
    }
}

impl FromStr for FilePath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
