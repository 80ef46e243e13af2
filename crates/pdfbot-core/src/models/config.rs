//! Configuration structures for the PDF service and its collaborators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no bot token is configured.
pub const TOKEN_ENV: &str = "PDFBOT_TELEGRAM_TOKEN";

/// Main configuration for pdfbot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfBotConfig {
    /// Telegram file retrieval configuration.
    pub telegram: TelegramConfig,

    /// Local directory retrieval configuration.
    pub local: LocalConfig,

    /// External diff program configuration.
    pub diff: DiffConfig,

    /// Watermark configuration.
    pub watermark: WatermarkConfig,

    /// Output artifact configuration.
    pub output: OutputConfig,
}

/// Telegram Bot API settings used to download chat attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Base URL of the Bot API.
    pub api_url: String,

    /// Bot token. Falls back to `PDFBOT_TELEGRAM_TOKEN` when unset.
    pub token: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            token: None,
            timeout_secs: 60,
        }
    }
}

/// Settings for resolving identifiers against a local directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory that identifiers are resolved against.
    pub root: Option<PathBuf>,
}

/// External diff program settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Program to run.
    pub program: String,

    /// Argument template. `{a}`, `{b}` and `{out}` are substituted.
    pub args: Vec<String>,

    /// Exit codes treated as success.
    pub success_codes: Vec<i32>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            program: "diff-pdf".to_string(),
            args: vec![
                "--output-diff={out}".to_string(),
                "{a}".to_string(),
                "{b}".to_string(),
            ],
            // diff-pdf exits with 1 when the documents differ
            success_codes: vec![0, 1],
        }
    }
}

/// Watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Page of the watermark document to stamp (1-indexed).
    pub page: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self { page: 1 }
    }
}

/// Output artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for temporary files (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,

    /// File extension of the diff artifact.
    pub diff_extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            diff_extension: "pdf".to_string(),
        }
    }
}

impl PdfBotConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Bot token from the config, or from [`TOKEN_ENV`].
    ///
    /// An empty configured token counts as unset.
    pub fn telegram_token(&self) -> Option<String> {
        self.telegram_token_or(std::env::var(TOKEN_ENV).ok())
    }

    fn telegram_token_or(&self, fallback: Option<String>) -> Option<String> {
        self.telegram
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| fallback.filter(|t| !t.is_empty()))
    }
}
