//! PDF library adapter.

mod import;
mod lopdf_backend;
#[cfg(test)]
pub(crate) mod testing;

pub use lopdf_backend::{FormStamp, LopdfBackend};

use std::path::Path;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF library implementations.
///
/// Implementations report malformed input from `open` as `PdfError::Parse`,
/// `PdfError::Encrypted` or `PdfError::NoPages`.
pub trait PdfBackend: Send + Sync + 'static {
    /// An opened document.
    type Document: Send + 'static;

    /// A watermark prepared for stamping into one target document.
    type Stamp: Send + 'static;

    /// Open and parse the PDF at `path`.
    fn open(&self, path: &Path) -> Result<Self::Document>;

    /// Get the number of pages in the document.
    fn page_count(&self, doc: &Self::Document) -> u32;

    /// Copy the watermark page of `watermark` into `doc`.
    fn import_watermark(
        &self,
        doc: &mut Self::Document,
        watermark: &Self::Document,
    ) -> Result<Self::Stamp>;

    /// Draw `stamp` on top of `page` (1-indexed).
    fn add_watermark(&self, doc: &mut Self::Document, page: u32, stamp: &Self::Stamp) -> Result<()>;

    /// Write the document to `dest`.
    fn write(&self, doc: &mut Self::Document, dest: &Path) -> Result<()>;
}
