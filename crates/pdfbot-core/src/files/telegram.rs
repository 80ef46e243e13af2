//! Retrieval of chat attachments through the Telegram Bot API.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use super::{FileRetriever, ScopedFile, temp_file_for};
use crate::error::RetrievalError;
use crate::models::DocumentId;
use crate::models::config::TelegramConfig;

/// Downloads attachments by `file_id` with `getFile`.
#[derive(Clone)]
pub struct TelegramFileRetriever {
    client: reqwest::Client,
    api_url: String,
    token: String,
    temp_dir: Option<PathBuf>,
}

impl fmt::Debug for TelegramFileRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramFileRetriever")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

impl TelegramFileRetriever {
    /// Build a retriever for the bot identified by `token`.
    pub fn new(config: &TelegramConfig, token: impl Into<String>) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pdfbot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            temp_dir: None,
        })
    }

    /// Place downloads in `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    async fn file_path(&self, id: &DocumentId) -> Result<String, RetrievalError> {
        let url = format!("{}/bot{}/getFile", self.api_url, self.token);
        let response = self
            .client
            .get(&url)
            .query(&[("file_id", id.as_str())])
            .send()
            .await
            .map_err(redact)?;

        let body: ApiResponse<TelegramFile> = response.json().await.map_err(redact)?;
        if !body.ok {
            return Err(RetrievalError::Api(
                body.description.unwrap_or_else(|| "getFile failed".to_string()),
            ));
        }

        body.result
            .and_then(|f| f.file_path)
            .ok_or_else(|| RetrievalError::NotFound(id.to_string()))
    }
}

/// Both API URLs carry the bot token.
fn redact(e: reqwest::Error) -> reqwest::Error {
    e.without_url()
}

impl FileRetriever for TelegramFileRetriever {
    async fn download_file(&self, id: &DocumentId) -> Result<ScopedFile, RetrievalError> {
        let file_path = self.file_path(id).await?;
        trace!("Resolved {} to {}", id, file_path);

        let url = format!("{}/file/bot{}/{}", self.api_url, self.token, file_path);
        let response = self.client.get(&url).send().await.map_err(redact)?;

        if !response.status().is_success() {
            return Err(RetrievalError::Status {
                status: response.status().as_u16(),
                file: file_path,
            });
        }

        let (file, temp) = temp_file_for(&file_path, self.temp_dir.as_deref())?.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(redact)?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        drop(file);

        debug!("Downloaded {} ({} bytes)", id, downloaded);
        Ok(ScopedFile::temporary(temp))
    }
}
