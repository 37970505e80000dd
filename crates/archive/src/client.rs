//! archive.org HTTP client.
//!
//! Async client using `reqwest`: metadata lookups plus streaming per-file
//! downloads. Downloads use a separate client with an hour-scale timeout;
//! archive items routinely hold multi-GiB files.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::types::Metadata;

const DEFAULT_BASE_URL: &str = "https://archive.org";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(6 * 3600);

/// Errors from the archive client.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// HTTP status of the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::NotFound(_) => Some(404),
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            FetchError::Json(_) => None,
        }
    }

    /// True for timeout, connection and mid-body failures, where no
    /// definitive status was received.
    pub fn is_timeout_or_connect(&self) -> bool {
        matches!(
            self,
            FetchError::Http(e) if e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
        )
    }
}

/// An open streaming download.
pub struct Download {
    /// Content length declared by the transfer, when present.
    pub declared_len: Option<u64>,
    /// The response body as a chunk stream.
    pub bytes: Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// archive.org API client.
pub struct ArchiveClient {
    http: reqwest::Client,
    download: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    /// Creates a client against the public archive.org endpoints.
    pub fn new() -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(METADATA_TIMEOUT)
            .build()?;
        let download = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            download,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (mirrors, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fetches the metadata blob for an archive identifier.
    pub async fn fetch_metadata(&self, identifier: &str) -> Result<Metadata, FetchError> {
        let url = format!("{}/metadata/{identifier}", self.base_url);
        debug!(%url, "fetching metadata");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(identifier.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp.bytes().await?;
        let meta: Metadata = serde_json::from_slice(&body)?;
        Ok(meta)
    }

    /// Opens a streaming download of one file within an archive.
    pub async fn open_download(
        &self,
        identifier: &str,
        filename: &str,
    ) -> Result<Download, FetchError> {
        let url = format!("{}/download/{identifier}/{filename}", self.base_url);
        debug!(%url, "opening download");

        let resp = self.download.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(format!("{identifier}/{filename}")));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(Download {
            declared_len: resp.content_length(),
            bytes: Box::pin(resp.bytes_stream().map(|r| r.map_err(FetchError::Http))),
        })
    }
}
