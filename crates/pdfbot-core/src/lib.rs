//! Core library for the PDF bot.
//!
//! This crate provides:
//! - `PdfService`: PDF comparison and watermarking with scoped result files
//! - File retrieval by document identifier (local directory, Telegram Bot API)
//! - An external diff program runner
//! - A lopdf-based PDF adapter

pub mod diff;
pub mod error;
pub mod files;
pub mod models;
pub mod pdf;
pub mod service;

pub use diff::{CommandDiff, DiffRoutine};
pub use error::{DiffError, PdfBotError, PdfError, PdfReadError, Result, RetrievalError};
pub use files::{FileRetriever, LocalFileRetriever, ScopedFile};
#[cfg(feature = "telegram")]
pub use files::TelegramFileRetriever;
pub use models::{DocumentId, DocumentSource, PdfBotConfig};
pub use pdf::{LopdfBackend, PdfBackend};
pub use service::{PdfOutput, PdfService};
