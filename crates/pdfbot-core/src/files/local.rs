//! Retrieval of documents stored in a local directory.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{FileRetriever, ScopedFile, temp_file_for};
use crate::error::RetrievalError;
use crate::models::DocumentId;

/// Resolves identifiers as file names inside a root directory.
///
/// Each download is a private copy, so the returned guard always owns the file
/// it deletes.
#[derive(Debug, Clone)]
pub struct LocalFileRetriever {
    root: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl LocalFileRetriever {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp_dir: None,
        }
    }

    /// Place downloaded copies in `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &DocumentId) -> Result<PathBuf, RetrievalError> {
        let name = Path::new(id.as_str());
        let mut components = name.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(RetrievalError::InvalidId(id.to_string())),
        }
    }
}

impl FileRetriever for LocalFileRetriever {
    async fn download_file(&self, id: &DocumentId) -> Result<ScopedFile, RetrievalError> {
        let source = self.resolve(id)?;

        match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(RetrievalError::NotFound(id.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetrievalError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let temp = temp_file_for(id.as_str(), self.temp_dir.as_deref())?.into_temp_path();
        tokio::fs::copy(&source, &temp).await?;

        debug!("Retrieved {} from {}", id, source.display());
        Ok(ScopedFile::temporary(temp))
    }
}
