//! Network transport contract used by bound elements.
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[cfg(feature = "http")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Asynchronous text GET/POST. Bodies for POST are form-encoded fields.
///
/// Implementations report non-success statuses as errors and do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, TransportError>;

    async fn post(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError>;
}

pub type AbstractTransport = Arc<dyn Transport>;
