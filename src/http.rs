//! Shared HTTP helpers for the provider clients.

use crate::error::{IngestError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Build a JSON-accepting client with the given extra headers.
pub(crate) fn build_client(
    user_agent: &str,
    timeout: Duration,
    mut headers: HeaderMap,
) -> Result<Client> {
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| IngestError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Header value for a secret, hidden from debug output.
pub(crate) fn secret_header(name: &str, value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| IngestError::Configuration(format!("{name} contains invalid characters")))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Decode a JSON body, turning non-2xx statuses into [`IngestError::Http`].
///
/// A body that is not the expected JSON is an [`IngestError::Json`], not a
/// network error.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        warn!(status = status.as_u16(), url = %url, "Provider returned an error");
        return Err(IngestError::http(status.as_u16(), url, &body));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
