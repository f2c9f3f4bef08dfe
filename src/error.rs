//! Error types for bibingest.
//!
//! Library functions return `Result<T, IngestError>`; the CLI wraps these in
//! `anyhow` for context.

use thiserror::Error;

/// Maximum number of characters of a response body kept in an [`IngestError::Http`].
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Main error type for ingestion operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required credential or setting is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider answered with a non-2xx status
    #[error("HTTP {status} for {url} :: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Request URL, including query string
        url: String,
        /// Response body, truncated to [`MAX_ERROR_BODY_CHARS`]
        body: String,
    },

    /// Publisher name could not be resolved to a Crossref member id
    #[error("No Crossref member matches publisher {0:?}")]
    LookupFailure(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    /// Build an [`IngestError::Http`], truncating the body on a char boundary.
    pub fn http(status: u16, url: impl Into<String>, body: &str) -> Self {
        Self::Http {
            status,
            url: url.into(),
            body: truncate_chars(body, MAX_ERROR_BODY_CHARS),
        }
    }
}

/// Result type alias using `IngestError`
pub type Result<T> = std::result::Result<T, IngestError>;

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
