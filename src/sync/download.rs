//! Single-shot HTTP downloads.
//!
//! The sequencer only needs "GET this URL into that file and tell me how many
//! bytes arrived"; anything else (retries, resume, auth) is out of scope.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SyncError};

/// Fetches one URL into one file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// GET `url` and stream the body into `dest`, calling `on_bytes` with the
    /// running byte count. Anything but `200 OK` is an error and leaves `dest`
    /// untouched. Returns the number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_bytes: &mut (dyn FnMut(u64) + Send),
    ) -> Result<u64>;
}

/// [`Downloader`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_bytes: &mut (dyn FnMut(u64) + Send),
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::transport(url, e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SyncError::io(e, "creating download target", dest))?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SyncError::transport(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::io(e, "writing download", dest))?;
            written += chunk.len() as u64;
            on_bytes(written);
        }

        file.flush()
            .await
            .map_err(|e| SyncError::io(e, "flushing download", dest))?;

        Ok(written)
    }
}
