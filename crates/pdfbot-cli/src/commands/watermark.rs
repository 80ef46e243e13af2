//! Watermark command - stamp a watermark onto every page of a document.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use pdfbot_core::{DocumentSource, LocalFileRetriever, PdfService};

use super::config::load_config;
use super::retriever::{CliRetriever, build_retriever, spinner};

/// Arguments for the watermark command.
#[derive(Args)]
pub struct WatermarkArgs {
    /// Document to watermark (local path or document identifier)
    #[arg(required = true)]
    source: String,

    /// Watermark document (local path or document identifier)
    #[arg(required = true)]
    watermark: String,

    /// Output file (default: <source>_watermarked.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolve identifiers as file names in this directory
    #[arg(short, long)]
    source_dir: Option<PathBuf>,
}

/// Existing local files are used in place, anything else is an identifier.
fn classify(input: &str) -> DocumentSource {
    let path = Path::new(input);
    if path.is_file() {
        DocumentSource::ResolvedPath(path.to_path_buf())
    } else {
        DocumentSource::from(input)
    }
}

pub async fn run(args: WatermarkArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let source = classify(&args.source);
    let watermark = classify(&args.watermark);

    let needs_retrieval = [&source, &watermark]
        .iter()
        .any(|s| matches!(s, DocumentSource::Identifier(_)));
    let retriever = if needs_retrieval {
        build_retriever(args.source_dir.as_deref(), &config)?
    } else {
        info!("Both inputs are local files");
        CliRetriever::Local(LocalFileRetriever::new("."))
    };
    let service = PdfService::from_config(retriever, &config);

    let pb = spinner("Applying watermark...");
    let result = service.add_watermark_to_pdf(source, watermark).await;
    pb.finish_and_clear();

    let output = result?;
    let output_path = match args.output {
        Some(path) => path,
        None => PathBuf::from(
            output
                .path()
                .file_name()
                .unwrap_or_else(|| OsStr::new("watermarked.pdf")),
        ),
    };
    output.persist(&output_path).await?;
    output.close()?;

    println!(
        "{} Watermarked PDF written to {}",
        style("✓").green(),
        output_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
