//! Document identifiers and operation inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque handle to a remotely stored file, e.g. a chat attachment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Input of a PDF operation: something to retrieve, or a file already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Needs to be fetched through a `FileRetriever`.
    Identifier(DocumentId),
    /// Local file supplied by the caller. Never deleted by the service.
    ResolvedPath(PathBuf),
}

impl From<DocumentId> for DocumentSource {
    fn from(id: DocumentId) -> Self {
        Self::Identifier(id)
    }
}

impl From<&str> for DocumentSource {
    fn from(id: &str) -> Self {
        Self::Identifier(id.into())
    }
}

impl From<String> for DocumentSource {
    fn from(id: String) -> Self {
        Self::Identifier(id.into())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::ResolvedPath(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::ResolvedPath(path.to_path_buf())
    }
}
