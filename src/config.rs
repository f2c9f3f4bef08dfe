//! Runtime configuration.
//!
//! Everything the clients need is collected into [`IngestConfig`] once at
//! startup, so credentials are sanitized in one place instead of being read
//! from the environment by each client.

use crate::crossref::PagingStrategy;
use crate::error::{IngestError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default ScienceDirect API host
pub const DEFAULT_ELSEVIER_BASE_URL: &str = "https://api.elsevier.com";

/// Default Crossref REST API host
pub const DEFAULT_CROSSREF_BASE_URL: &str = "https://api.crossref.org";

/// Default directory for combined CSV and removal logs
pub const DEFAULT_OUTPUT_DIR: &str = "data/raw";

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Values that mean "key not filled in yet" in sample `.env` files
const PLACEHOLDER_KEYS: &[&str] = &["<tu_api_key>", "tu_api_key", "<your_api_key>", "your_api_key"];

/// ScienceDirect client settings.
#[derive(Debug, Clone)]
pub struct ScienceDirectConfig {
    /// Sanitized API key, `None` when missing or a placeholder
    pub api_key: Option<String>,
    /// Optional institutional token
    pub insttoken: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    /// Delay between page requests
    pub pacing: Duration,
}

impl Default for ScienceDirectConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            insttoken: None,
            base_url: DEFAULT_ELSEVIER_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pacing: Duration::from_millis(350),
        }
    }
}

impl ScienceDirectConfig {
    /// Return the API key or a configuration error naming the variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            IngestError::Configuration("ELSEVIER_API_KEY missing or placeholder".to_string())
        })
    }
}

/// Crossref client settings.
#[derive(Debug, Clone)]
pub struct CrossrefConfig {
    /// Contact email for the polite pool
    pub mailto: Option<String>,
    /// Deployment label appended to the User-Agent
    pub app_env: String,
    pub base_url: String,
    pub timeout: Duration,
    pub pacing: Duration,
    pub paging: PagingStrategy,
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            mailto: None,
            app_env: "dev".to_string(),
            base_url: DEFAULT_CROSSREF_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pacing: Duration::from_millis(150),
            paging: PagingStrategy::default(),
        }
    }
}

/// Top-level configuration for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub sciencedirect: ScienceDirectConfig,
    pub crossref: CrossrefConfig,
    pub output_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sciencedirect: ScienceDirectConfig::default(),
            crossref: CrossrefConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl IngestConfig {
    /// Load configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.sciencedirect.api_key = sanitize_credential(lookup("ELSEVIER_API_KEY"));
        config.sciencedirect.insttoken = sanitize_credential(lookup("ELSEVIER_INSTTOKEN"));
        if let Some(base) = non_empty(lookup("ELSEVIER_BASE_URL")) {
            config.sciencedirect.base_url = base;
        }

        config.crossref.mailto = non_empty(lookup("CROSSREF_MAILTO"));
        if let Some(env) = non_empty(lookup("APP_ENV")) {
            config.crossref.app_env = env;
        }
        if let Some(base) = non_empty(lookup("CROSSREF_BASE_URL")) {
            config.crossref.base_url = base;
        }
        if let Some(paging) = non_empty(lookup("CROSSREF_PAGING")) {
            config.crossref.paging = paging.parse().map_err(IngestError::Configuration)?;
        }

        if let Some(dir) = non_empty(lookup("BIBINGEST_OUTPUT_DIR")) {
            config.output_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check base URLs parse and strip trailing slashes.
    pub fn validate(&mut self) -> Result<()> {
        self.sciencedirect.base_url = checked_base_url(&self.sciencedirect.base_url)?;
        self.crossref.base_url = checked_base_url(&self.crossref.base_url)?;
        Ok(())
    }
}

/// Trim whitespace and quotes; reject empty values and known placeholders.
pub fn sanitize_credential(raw: Option<String>) -> Option<String> {
    let value = raw?;
    let value = value.trim().trim_matches(['"', '\'']).trim();
    if value.is_empty() || PLACEHOLDER_KEYS.contains(&value.to_lowercase().as_str()) {
        return None;
    }
    Some(value.to_string())
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn checked_base_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|e| IngestError::Configuration(format!("Invalid base URL {raw:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IngestError::Configuration(format!(
            "Base URL must be http(s): {raw}"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
