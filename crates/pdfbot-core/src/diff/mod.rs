//! Visual/content comparison of two PDF files.

mod command;

pub use command::CommandDiff;

use std::future::Future;
use std::path::Path;

use crate::error::DiffError;

/// Produces a diff artifact from two files.
///
/// The routine is opaque: the only contract is that a successful run leaves a
/// file at `out`.
pub trait DiffRoutine: Send + Sync {
    fn run(
        &self,
        a: &Path,
        b: &Path,
        out: &Path,
    ) -> impl Future<Output = Result<(), DiffError>> + Send;
}
