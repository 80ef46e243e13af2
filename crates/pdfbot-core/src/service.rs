//! PDF comparison and watermarking on top of the retrieval, diff and PDF
//! collaborators.
//!
//! Every operation returns a [`PdfOutput`] that owns the result file and all
//! files retrieved for it. Dropping the output removes them; an operation that
//! fails removes them before the error reaches the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::diff::{CommandDiff, DiffRoutine};
use crate::error::{PdfBotError, PdfReadError, Result};
use crate::files::{FileRetriever, ScopedFile};
use crate::models::{DocumentId, DocumentSource, PdfBotConfig};
use crate::pdf::{LopdfBackend, PdfBackend};

/// Façade used by the bot to compare and watermark PDFs.
#[derive(Debug)]
pub struct PdfService<R, D = CommandDiff, B = LopdfBackend> {
    retriever: R,
    diff: D,
    backend: Arc<B>,
    temp_dir: Option<PathBuf>,
    diff_extension: String,
}

impl<R: FileRetriever> PdfService<R> {
    /// Create a service with the default diff program and lopdf backend.
    pub fn new(retriever: R) -> Self {
        Self::from_config(retriever, &PdfBotConfig::default())
    }

    pub fn from_config(retriever: R, config: &PdfBotConfig) -> Self {
        Self {
            retriever,
            diff: CommandDiff::from_config(&config.diff),
            backend: Arc::new(LopdfBackend::new().with_watermark_page(config.watermark.page)),
            temp_dir: config.output.temp_dir.clone(),
            diff_extension: config.output.diff_extension.clone(),
        }
    }
}

impl<R, D, B> PdfService<R, D, B>
where
    R: FileRetriever,
    D: DiffRoutine,
    B: PdfBackend,
{
    /// Replace the diff routine.
    pub fn with_diff<D2: DiffRoutine>(self, diff: D2) -> PdfService<R, D2, B> {
        PdfService {
            retriever: self.retriever,
            diff,
            backend: self.backend,
            temp_dir: self.temp_dir,
            diff_extension: self.diff_extension,
        }
    }

    /// Replace the PDF library adapter.
    pub fn with_backend<B2: PdfBackend>(self, backend: B2) -> PdfService<R, D, B2> {
        PdfService {
            retriever: self.retriever,
            diff: self.diff,
            backend: Arc::new(backend),
            temp_dir: self.temp_dir,
            diff_extension: self.diff_extension,
        }
    }

    /// Create output directories under `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    pub fn diff_routine(&self) -> &D {
        &self.diff
    }

    /// Compare two documents with the diff routine.
    ///
    /// Both documents are retrieved concurrently; the routine then runs once
    /// with their paths in the order given.
    pub async fn compare_pdfs(
        &self,
        doc_a: impl Into<DocumentId>,
        doc_b: impl Into<DocumentId>,
    ) -> Result<PdfOutput> {
        let (doc_a, doc_b) = (doc_a.into(), doc_b.into());
        info!("Comparing {} with {}", doc_a, doc_b);

        let (file_a, file_b) = tokio::try_join!(
            self.retriever.download_file(&doc_a),
            self.retriever.download_file(&doc_b),
        )?;

        let dir = self.output_dir()?;
        let out = dir.path().join(format!("differences.{}", self.diff_extension));
        self.diff.run(file_a.path(), file_b.path(), &out).await?;

        debug!("Diff written to {}", out.display());
        Ok(PdfOutput::new(dir, out, vec![file_a, file_b]))
    }

    /// Stamp a page of `wmk` on top of every page of `src`.
    pub async fn add_watermark_to_pdf(
        &self,
        src: impl Into<DocumentSource>,
        wmk: impl Into<DocumentSource>,
    ) -> Result<PdfOutput> {
        let (src, wmk) = tokio::try_join!(self.resolve(src.into()), self.resolve(wmk.into()))?;

        let dir = self.output_dir()?;
        let out = dir.path().join(watermarked_name(src.path()));

        let backend = Arc::clone(&self.backend);
        let (src_path, wmk_path, out_path) =
            (src.path().to_path_buf(), wmk.path().to_path_buf(), out.clone());
        tokio::task::spawn_blocking(move || stamp_file(&*backend, &src_path, &wmk_path, &out_path))
            .await
            .map_err(|e| PdfBotError::Io(std::io::Error::other(e)))??;

        info!("Watermarked {} into {}", src.path().display(), out.display());
        Ok(PdfOutput::new(dir, out, vec![src, wmk]))
    }

    async fn resolve(
        &self,
        source: DocumentSource,
    ) -> std::result::Result<ScopedFile, crate::error::RetrievalError> {
        match source {
            DocumentSource::Identifier(id) => self.retriever.download_file(&id).await,
            DocumentSource::ResolvedPath(path) => Ok(ScopedFile::borrowed(path)),
        }
    }

    fn output_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdfbot-out-");
        let dir = match &self.temp_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

/// Open a document, reporting malformed input as [`PdfReadError`].
fn open_document<B: PdfBackend>(backend: &B, path: &Path) -> Result<B::Document> {
    backend
        .open(path)
        .map_err(|e| PdfReadError::from_adapter(path, e))
}

fn stamp_file<B: PdfBackend>(backend: &B, src: &Path, wmk: &Path, out: &Path) -> Result<()> {
    let mut doc = open_document(backend, src)?;
    let watermark = open_document(backend, wmk)?;

    let stamp = backend.import_watermark(&mut doc, &watermark)?;
    let pages = backend.page_count(&doc);
    for page in 1..=pages {
        backend.add_watermark(&mut doc, page, &stamp)?;
    }
    debug!("Stamped {} pages", pages);

    backend.write(&mut doc, out)?;
    Ok(())
}

fn watermarked_name(src: &Path) -> String {
    let stem = src
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}_watermarked.pdf")
}

/// Result file of a [`PdfService`] operation.
///
/// Owns the output directory and the operation's input files; all of them are
/// removed when this value drops.
#[derive(Debug)]
pub struct PdfOutput {
    path: PathBuf,
    inputs: Vec<ScopedFile>,
    dir: TempDir,
}

impl PdfOutput {
    fn new(dir: TempDir, path: PathBuf, inputs: Vec<ScopedFile>) -> Self {
        Self { path, inputs, dir }
    }

    /// Path of the result file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the result file.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Copy the result file to `dest`, outside of this scope.
    pub async fn persist(&self, dest: impl AsRef<Path>) -> std::io::Result<u64> {
        tokio::fs::copy(&self.path, dest).await
    }

    /// Release everything now, reporting failures to remove the output.
    pub fn close(self) -> std::io::Result<()> {
        let Self { inputs, dir, .. } = self;
        drop(inputs);
        dir.close()
    }
}

impl AsRef<Path> for PdfOutput {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DiffError, PdfError, RetrievalError};
    use crate::pdf::testing::write_sample;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves fixed bytes per identifier from temporary files in `scratch`.
    struct FakeRetriever {
        scratch: PathBuf,
        files: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<DocumentId>>,
        handed_out: Mutex<Vec<PathBuf>>,
    }

    impl FakeRetriever {
        fn new(scratch: &Path) -> Self {
            Self {
                scratch: scratch.to_path_buf(),
                files: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                handed_out: Mutex::new(Vec::new()),
            }
        }

        fn with_file(mut self, id: &str, content: impl Into<Vec<u8>>) -> Self {
            self.files.insert(id.to_string(), content.into());
            self
        }

        fn calls(&self) -> Vec<String> {
            let mut calls: Vec<String> = self
                .calls
                .lock()
                .unwrap()
                .iter()
                .map(|id| id.to_string())
                .collect();
            calls.sort();
            calls
        }

        fn handed_out(&self) -> Vec<PathBuf> {
            self.handed_out.lock().unwrap().clone()
        }
    }

    impl FileRetriever for FakeRetriever {
        async fn download_file(
            &self,
            id: &DocumentId,
        ) -> std::result::Result<ScopedFile, RetrievalError> {
            self.calls.lock().unwrap().push(id.clone());
            let content = self
                .files
                .get(id.as_str())
                .ok_or_else(|| RetrievalError::NotFound(id.to_string()))?;

            let file = tempfile::Builder::new()
                .prefix("fake-")
                .suffix(".pdf")
                .tempfile_in(&self.scratch)?;
            std::fs::write(file.path(), content)?;
            self.handed_out.lock().unwrap().push(file.path().to_path_buf());
            Ok(ScopedFile::temporary(file.into_temp_path()))
        }
    }

    /// Records what it was asked to compare and writes a marker output.
    #[derive(Default)]
    struct FakeDiff {
        runs: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl DiffRoutine for FakeDiff {
        async fn run(&self, a: &Path, b: &Path, out: &Path) -> std::result::Result<(), DiffError> {
            let a = std::fs::read_to_string(a).unwrap();
            let b = std::fs::read_to_string(b).unwrap();
            self.runs.lock().unwrap().push((a, b));
            if self.fail {
                return Err(DiffError::Failed {
                    code: Some(2),
                    stderr: "boom".to_string(),
                });
            }
            std::fs::write(out, b"diff").unwrap();
            Ok(())
        }
    }

    /// Fails every open as malformed input.
    struct BrokenBackend;

    impl PdfBackend for BrokenBackend {
        type Document = ();
        type Stamp = ();

        fn open(&self, _path: &Path) -> crate::pdf::Result<()> {
            Err(PdfError::Parse("invalid cross-reference table".to_string()))
        }

        fn page_count(&self, _doc: &()) -> u32 {
            0
        }

        fn import_watermark(&self, _doc: &mut (), _watermark: &()) -> crate::pdf::Result<()> {
            unreachable!()
        }

        fn add_watermark(&self, _doc: &mut (), _page: u32, _stamp: &()) -> crate::pdf::Result<()> {
            unreachable!()
        }

        fn write(&self, _doc: &mut (), _dest: &Path) -> crate::pdf::Result<()> {
            unreachable!()
        }
    }

    fn is_empty_dir(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn compare_retrieves_both_and_diffs_once_in_order() {
        let scratch = tempfile::tempdir().unwrap();
        let retriever = FakeRetriever::new(scratch.path())
            .with_file("docA", "content A")
            .with_file("docB", "content B");
        let service = PdfService::new(retriever).with_diff(FakeDiff::default());

        let output = service.compare_pdfs("docA", "docB").await.unwrap();

        assert_eq!(service.retriever().calls(), vec!["docA", "docB"]);
        assert_eq!(
            *service.diff_routine().runs.lock().unwrap(),
            vec![("content A".to_string(), "content B".to_string())]
        );
        assert_eq!(output.read().await.unwrap(), b"diff");
    }

    #[tokio::test]
    async fn compare_cleans_up_on_drop() {
        let scratch = tempfile::tempdir().unwrap();
        let out_root = tempfile::tempdir().unwrap();
        let retriever = FakeRetriever::new(scratch.path())
            .with_file("docA", "a")
            .with_file("docB", "b");
        let service = PdfService::new(retriever)
            .with_diff(FakeDiff::default())
            .with_temp_dir(out_root.path());

        let output = service.compare_pdfs("docA", "docB").await.unwrap();
        let out_path = output.path().to_path_buf();
        assert!(out_path.exists());
        assert_eq!(out_path.extension().unwrap(), "pdf");
        for path in service.retriever().handed_out() {
            assert!(path.exists());
        }

        drop(output);
        assert!(!out_path.exists());
        assert!(is_empty_dir(scratch.path()));
        assert!(is_empty_dir(out_root.path()));
    }

    #[tokio::test]
    async fn compare_propagates_retrieval_error_and_releases_other_input() {
        let scratch = tempfile::tempdir().unwrap();
        let retriever = FakeRetriever::new(scratch.path()).with_file("docA", "a");
        let service = PdfService::new(retriever).with_diff(FakeDiff::default());

        let err = service.compare_pdfs("docA", "missing").await.unwrap_err();

        assert!(matches!(err, PdfBotError::Retrieval(RetrievalError::NotFound(id)) if id == "missing"));
        assert!(service.diff_routine().runs.lock().unwrap().is_empty());
        assert!(is_empty_dir(scratch.path()));
    }

    #[tokio::test]
    async fn compare_propagates_diff_error() {
        let scratch = tempfile::tempdir().unwrap();
        let out_root = tempfile::tempdir().unwrap();
        let retriever = FakeRetriever::new(scratch.path())
            .with_file("docA", "a")
            .with_file("docB", "b");
        let service = PdfService::new(retriever)
            .with_diff(FakeDiff {
                fail: true,
                ..FakeDiff::default()
            })
            .with_temp_dir(out_root.path());

        let err = service.compare_pdfs("docA", "docB").await.unwrap_err();

        assert!(matches!(err, PdfBotError::Diff(DiffError::Failed { code: Some(2), .. })));
        assert!(is_empty_dir(scratch.path()));
        assert!(is_empty_dir(out_root.path()));
    }

    #[tokio::test]
    async fn watermark_local_files() {
        let fixtures = tempfile::tempdir().unwrap();
        let src = write_sample(fixtures.path(), "base.pdf", 3, "Base");
        let wmk = write_sample(fixtures.path(), "watermark.pdf", 1, "Mark");
        let service = PdfService::new(FakeRetriever::new(fixtures.path()));

        let output = service
            .add_watermark_to_pdf(src.as_path(), wmk.as_path())
            .await
            .unwrap();

        assert_eq!(output.path().file_name().unwrap(), "base_watermarked.pdf");
        let backend = LopdfBackend::new();
        let doc = backend.open(output.path()).unwrap();
        assert_eq!(backend.page_count(&doc), 3);
        for page_id in doc.get_pages().values() {
            let content = String::from_utf8_lossy(&doc.get_page_content(*page_id).unwrap()).into_owned();
            assert!(content.contains(" Do"), "{content}");
        }
        assert!(service.retriever().calls().is_empty());

        let out_path = output.path().to_path_buf();
        drop(output);
        assert!(!out_path.exists());
        assert!(src.exists() && wmk.exists());
    }

    #[tokio::test]
    async fn watermark_output_is_deterministic() {
        let fixtures = tempfile::tempdir().unwrap();
        let src = write_sample(fixtures.path(), "base.pdf", 2, "Base");
        let wmk = write_sample(fixtures.path(), "watermark.pdf", 1, "Mark");
        let service = PdfService::new(FakeRetriever::new(fixtures.path()));

        let first = service.add_watermark_to_pdf(src.as_path(), wmk.as_path()).await.unwrap();
        let second = service.add_watermark_to_pdf(src.as_path(), wmk.as_path()).await.unwrap();

        let size = |p: &Path| std::fs::metadata(p).unwrap().len();
        assert_eq!(size(first.path()), size(second.path()));
    }

    #[tokio::test]
    async fn watermark_retrieves_identifiers() {
        let fixtures = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let src = write_sample(fixtures.path(), "base.pdf", 2, "Base");
        let wmk = write_sample(fixtures.path(), "watermark.pdf", 1, "Mark");
        let retriever = FakeRetriever::new(scratch.path())
            .with_file("src_id", std::fs::read(&src).unwrap())
            .with_file("wmk_id", std::fs::read(&wmk).unwrap());
        let service = PdfService::new(retriever);

        let output = service.add_watermark_to_pdf("src_id", "wmk_id").await.unwrap();

        assert_eq!(service.retriever().calls(), vec!["src_id", "wmk_id"]);
        assert!(output.path().exists());
        output.close().unwrap();
        assert!(is_empty_dir(scratch.path()));
    }

    #[tokio::test]
    async fn watermark_malformed_source_is_read_error_without_output() {
        let fixtures = tempfile::tempdir().unwrap();
        let out_root = tempfile::tempdir().unwrap();
        let src = fixtures.path().join("broken.pdf");
        std::fs::write(&src, b"%PDF-1.4 truncated").unwrap();
        let wmk = write_sample(fixtures.path(), "watermark.pdf", 1, "Mark");
        let service = PdfService::new(FakeRetriever::new(fixtures.path())).with_temp_dir(out_root.path());

        let err = service
            .add_watermark_to_pdf(src.as_path(), wmk.as_path())
            .await
            .unwrap_err();

        match err {
            PdfBotError::PdfRead(read) => assert_eq!(read.path, src),
            other => panic!("expected PdfRead, got {other:?}"),
        }
        assert!(is_empty_dir(out_root.path()));
    }

    #[tokio::test]
    async fn watermark_malformed_watermark_is_read_error() {
        let fixtures = tempfile::tempdir().unwrap();
        let src = write_sample(fixtures.path(), "base.pdf", 1, "Base");
        let wmk = fixtures.path().join("watermark.pdf");
        std::fs::write(&wmk, b"GIF89a").unwrap();
        let service = PdfService::new(FakeRetriever::new(fixtures.path()));

        let err = service
            .add_watermark_to_pdf(src.as_path(), wmk.as_path())
            .await
            .unwrap_err();

        assert!(matches!(err, PdfBotError::PdfRead(read) if read.path == wmk));
    }

    #[tokio::test]
    async fn adapter_read_failure_is_translated_and_inputs_released() {
        let scratch = tempfile::tempdir().unwrap();
        let out_root = tempfile::tempdir().unwrap();
        let retriever = FakeRetriever::new(scratch.path()).with_file("file_id", "whatever");
        let service = PdfService::new(retriever)
            .with_backend(BrokenBackend)
            .with_temp_dir(out_root.path());

        let err = service
            .add_watermark_to_pdf("file_id", "file_id")
            .await
            .unwrap_err();

        match err {
            PdfBotError::PdfRead(read) => {
                assert_eq!(read.message, "invalid cross-reference table");
            }
            other => panic!("expected PdfRead, got {other:?}"),
        }
        assert_eq!(service.retriever().calls(), vec!["file_id", "file_id"]);
        assert!(is_empty_dir(scratch.path()));
        assert!(is_empty_dir(out_root.path()));
    }

    #[test]
    fn watermarked_name_uses_source_stem() {
        assert_eq!(watermarked_name(Path::new("/tmp/report.final.pdf")), "report.final_watermarked.pdf");
        assert_eq!(watermarked_name(Path::new("/")), "document_watermarked.pdf");
    }
}
