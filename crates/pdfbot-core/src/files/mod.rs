//! File retrieval and scoped local files.

mod local;
#[cfg(feature = "telegram")]
mod telegram;

pub use local::LocalFileRetriever;
#[cfg(feature = "telegram")]
pub use telegram::TelegramFileRetriever;

use std::future::Future;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::RetrievalError;
use crate::models::DocumentId;

/// A local file bound to the lifetime of this guard.
///
/// Temporary files are removed when the guard drops. Borrowed paths belong to
/// the caller and are left alone.
#[derive(Debug)]
pub enum ScopedFile {
    /// Owned temporary file, deleted on drop.
    Temporary(TempPath),
    /// Caller-owned file.
    Borrowed(PathBuf),
}

impl ScopedFile {
    pub fn temporary(path: TempPath) -> Self {
        Self::Temporary(path)
    }

    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self::Borrowed(path.into())
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Temporary(path) => &**path,
            Self::Borrowed(path) => path,
        }
    }

    /// Whether dropping this guard deletes the file.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl AsRef<Path> for ScopedFile {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Fetches a document by identifier into a local file.
pub trait FileRetriever: Send + Sync {
    /// Download the document behind `id`.
    ///
    /// Every call yields an independent guard; a retriever may be called
    /// several times for one operation.
    fn download_file(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<ScopedFile, RetrievalError>> + Send;
}

/// Create a temporary file that keeps the extension of `name`.
pub(crate) fn temp_file_for(
    name: &str,
    dir: Option<&Path>,
) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix("pdfbot-").suffix(&suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_file_is_removed_on_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let scoped = ScopedFile::temporary(file.into_temp_path());
        let path = scoped.path().to_path_buf();
        assert!(path.exists());

        drop(scoped);
        assert!(!path.exists());
    }

    #[test]
    fn borrowed_file_survives_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let scoped = ScopedFile::borrowed(file.path());
        assert!(!scoped.is_temporary());

        drop(scoped);
        assert!(file.path().exists());
    }

    #[test]
    fn temp_file_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = temp_file_for("documents/file_7.pdf", Some(dir.path())).unwrap();

        assert_eq!(file.path().extension().unwrap(), "pdf");
        assert!(file.path().starts_with(dir.path()));
    }
}
