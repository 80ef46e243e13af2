//! Choosing a file retriever from flags and configuration.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use pdfbot_core::models::config::PdfBotConfig;
use pdfbot_core::{
    DocumentId, FileRetriever, LocalFileRetriever, RetrievalError, ScopedFile,
    TelegramFileRetriever,
};

/// Retriever selected at runtime.
pub enum CliRetriever {
    Local(LocalFileRetriever),
    Telegram(TelegramFileRetriever),
}

impl FileRetriever for CliRetriever {
    async fn download_file(&self, id: &DocumentId) -> Result<ScopedFile, RetrievalError> {
        match self {
            Self::Local(retriever) => retriever.download_file(id).await,
            Self::Telegram(retriever) => retriever.download_file(id).await,
        }
    }
}

/// `--source-dir`, then `local.root`, then the Telegram bot token.
pub fn build_retriever(
    source_dir: Option<&Path>,
    config: &PdfBotConfig,
) -> anyhow::Result<CliRetriever> {
    let local_root = source_dir.or(config.local.root.as_deref());

    let retriever = if let Some(root) = local_root {
        debug!("Resolving documents in {}", root.display());
        let mut local = LocalFileRetriever::new(root);
        if let Some(dir) = &config.output.temp_dir {
            local = local.with_temp_dir(dir);
        }
        CliRetriever::Local(local)
    } else if let Some(token) = config.telegram_token() {
        debug!("Resolving documents through {}", config.telegram.api_url);
        let mut telegram = TelegramFileRetriever::new(&config.telegram, token)?;
        if let Some(dir) = &config.output.temp_dir {
            telegram = telegram.with_temp_dir(dir);
        }
        CliRetriever::Telegram(telegram)
    } else {
        anyhow::bail!(
            "No document source configured.\n\n\
             Pass --source-dir, set local.root, or set PDFBOT_TELEGRAM_TOKEN."
        );
    };

    Ok(retriever)
}

pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message);
    pb
}
