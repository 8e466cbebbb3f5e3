//! Implements the `Drive` trait with the Google Drive v3 REST API.

use crate::api::{Drive, TokenProvider};
use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// The MIME type Drive converts a Google Sheet to on export.
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Implements the `Drive` trait against Google Drive. It takes a `TokenProvider`, on which it calls
/// refresh to keep the access token up-to-date.
pub(super) struct GoogleDrive {
    token_provider: TokenProvider,
    client: reqwest::Client,
}

impl GoogleDrive {
    pub(super) fn new(token_provider: TokenProvider) -> Self {
        Self {
            token_provider,
            client: reqwest::Client::new(),
        }
    }

    /// Streams the body of a GET request to `destination`. Returns the number of bytes written.
    async fn get_to_file(&mut self, url: &str, query: &[(&str, &str)], destination: &Path) -> Res<u64> {
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let mut response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request to the Google Drive API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Google Drive API request failed with status {status}: {body}");
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .with_context(|| format!("Unable to create {}", destination.display()))?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed while reading the response from Google Drive")?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Unable to write to {}", destination.display()))?;
            written += chunk.len() as u64;
            trace!("{written} bytes written to {}", destination.display());
        }
        file.flush()
            .await
            .with_context(|| format!("Unable to write to {}", destination.display()))?;
        Ok(written)
    }

    /// Like `get_to_file`, but a partially written file is removed on failure so that a later run
    /// does not mistake it for a finished download.
    async fn fetch(&mut self, url: &str, query: &[(&str, &str)], destination: &Path) -> Res<()> {
        match self.get_to_file(url, query, destination).await {
            Ok(bytes) => {
                debug!("Wrote {bytes} bytes to {}", destination.display());
                Ok(())
            }
            Err(e) => {
                if destination.is_file() {
                    if let Err(remove_error) = utils::remove(destination).await {
                        warn!("{remove_error:#}");
                    }
                }
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl Drive for GoogleDrive {
    async fn export_spreadsheet(&mut self, spreadsheet_id: &str, destination: &Path) -> Res<()> {
        let url = format!("{FILES_URL}/{spreadsheet_id}/export");
        self.fetch(&url, &[("mimeType", XLSX_MIME)], destination)
            .await
            .with_context(|| format!("Failed to export spreadsheet {spreadsheet_id}"))
    }

    async fn download_file(&mut self, file_id: &str, destination: &Path) -> Res<()> {
        let url = format!("{FILES_URL}/{file_id}");
        self.fetch(
            &url,
            &[("alt", "media"), ("supportsAllDrives", "true")],
            destination,
        )
        .await
        .with_context(|| format!("Failed to download file {file_id}"))
    }
}
