//! Data models shared across the library.

pub mod config;
pub mod document;

pub use config::PdfBotConfig;
pub use document::{DocumentId, DocumentSource};
