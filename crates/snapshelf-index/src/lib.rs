//! HTTP client for the semantic indexing backend.
//!
//! The backend exposes two JSON endpoints:
//!
//! - `POST /upload` `{ userId, photoURLs }` registers freshly stored images
//!   for indexing. The upload pipeline calls it through [`IndexNotifier`].
//! - `POST /search` `{ userId, text, k }` returns ranked matches.
//!
//! Any non-2xx response is an error.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use snapshelf_core::models::{SearchHit, SearchRequest, SearchResponse, UploadNotification};
use snapshelf_core::{AppError, Config};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Failed to reach indexing backend: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search text is empty")]
    EmptyQuery,

    #[error("Failed to reach indexing backend: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        AppError::Notification(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => AppError::InvalidInput(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Acknowledgement body returned by `POST /upload`. `Null` when the backend
/// answered 2xx without a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAck(pub serde_json::Value);

/// Receives the URLs of a settled batch.
#[async_trait]
pub trait IndexNotifier: Send + Sync {
    async fn notify_upload(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<IndexAck, NotificationError>;
}

/// Client for the indexing backend.
#[derive(Clone, Debug)]
pub struct IndexClient {
    client: Client,
    base_url: String,
}

impl IndexClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(config.index_service_url(), config.index_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ranked matches for `text`. Whitespace around the query is trimmed and an
    /// empty query is rejected without contacting the backend.
    pub async fn search(
        &self,
        user_id: &str,
        text: &str,
        k: u32,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let body = SearchRequest {
            user_id: user_id.to_string(),
            text: text.to_string(),
            k,
        };

        let response = self
            .client
            .post(self.build_url("/search"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let parsed: SearchResponse = decode_or_default(&bytes)?;

        tracing::debug!(user_id = %user_id, hits = parsed.results.len(), "Search completed");

        Ok(parsed.results)
    }
}

/// An empty body decodes as the type's default.
fn decode_or_default<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
}

#[async_trait]
impl IndexNotifier for IndexClient {
    async fn notify_upload(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<IndexAck, NotificationError> {
        let body = UploadNotification {
            user_id: user_id.to_string(),
            photo_urls: urls.to_vec(),
        };

        let response = self
            .client
            .post(self.build_url("/upload"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let ack = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

        tracing::info!(user_id = %user_id, url_count = urls.len(), "Indexing backend acknowledged upload");

        Ok(IndexAck(ack))
    }
}
