//! Error types for the pdfbot-core library.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the pdfbot library.
#[derive(Error, Debug)]
pub enum PdfBotError {
    /// An input could not be read as a PDF document.
    #[error(transparent)]
    PdfRead(#[from] PdfReadError),

    /// PDF processing error that is not a read failure.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// File retrieval error, passed through as raised by the retriever.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Diff routine error, passed through as raised by the routine.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The input could not be parsed as a valid PDF document.
///
/// Callers only ever see this type for malformed input, whichever PDF
/// library sits underneath.
#[derive(Error, Debug)]
#[error("could not read PDF {}: {message}", .path.display())]
pub struct PdfReadError {
    /// File that failed to parse.
    pub path: PathBuf,
    /// Human readable reason.
    pub message: String,
}

impl PdfReadError {
    /// Translate an adapter error raised while opening `path`.
    ///
    /// Malformed, encrypted and empty documents become a `PdfReadError`;
    /// anything else is handed back untouched.
    pub fn from_adapter(path: &Path, err: PdfError) -> PdfBotError {
        match err {
            PdfError::Parse(message) => Self::new(path, message).into(),
            PdfError::Encrypted => Self::new(path, "document is encrypted").into(),
            PdfError::NoPages => Self::new(path, "document has no pages").into(),
            other => other.into(),
        }
    }

    fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Errors raised by the PDF library adapter.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// Failed to stamp the watermark onto a page.
    #[error("failed to apply watermark: {0}")]
    Watermark(String),

    /// Failed to write the resulting document.
    #[error("failed to write PDF: {0}")]
    Write(String),

    /// I/O error while reading the input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while retrieving a document by identifier.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The identifier is not acceptable to the retriever.
    #[error("invalid document identifier: {0}")]
    InvalidId(String),

    /// No document exists for the identifier.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The remote API refused the request.
    #[error("API error: {0}")]
    Api(String),

    /// The remote server answered with a non-success status.
    #[error("HTTP {status} while downloading {file}")]
    Status { status: u16, file: String },

    /// Transport error.
    #[cfg(feature = "telegram")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error while storing the downloaded file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the diff routine.
#[derive(Error, Debug)]
pub enum DiffError {
    /// The diff program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The diff program exited with a status that is not accepted.
    #[error("diff program exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The diff program succeeded but left no output file.
    #[error("diff program produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Result type for the pdfbot library.
pub type Result<T> = std::result::Result<T, PdfBotError>;
