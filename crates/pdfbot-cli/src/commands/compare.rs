//! Compare command - diff two documents.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::debug;

use pdfbot_core::PdfService;

use super::config::load_config;
use super::retriever::{build_retriever, spinner};

/// Arguments for the compare command.
#[derive(Args)]
pub struct CompareArgs {
    /// First document identifier
    #[arg(required = true)]
    first: String,

    /// Second document identifier
    #[arg(required = true)]
    second: String,

    /// Output file (default: differences.<ext> in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolve identifiers as file names in this directory
    #[arg(short, long)]
    source_dir: Option<PathBuf>,
}

pub async fn run(args: CompareArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let retriever = build_retriever(args.source_dir.as_deref(), &config)?;
    let service = PdfService::from_config(retriever, &config);

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("differences.{}", config.output.diff_extension)));

    let pb = spinner("Comparing documents...");
    let result = service.compare_pdfs(args.first.as_str(), args.second.as_str()).await;
    pb.finish_and_clear();

    let output = result?;
    output.persist(&output_path).await?;
    output.close()?;

    println!(
        "{} Differences written to {}",
        style("✓").green(),
        output_path.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
