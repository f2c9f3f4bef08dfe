//! Elsevier ScienceDirect search API client.
//!
//! Offset pagination: each request sends `start`/`count` and the next
//! request starts where the previous page ended. Elsevier allows a few
//! requests per second per key, so pages are spaced by a fixed delay.

use crate::config::ScienceDirectConfig;
use crate::error::{IngestError, Result};
use crate::http::{build_client, read_json, secret_header};
use crate::lenient;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const SEARCH_PATH: &str = "/content/search/sciencedirect";
const ARTICLE_PII_PATH: &str = "/content/article/pii";

/// Maximum `count` accepted by the search endpoint
pub const MAX_PAGE_SIZE: usize = 100;

/// Default view for article metadata lookups
pub const DEFAULT_ARTICLE_VIEW: &str = "META_ABS";

/// One page of search results.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchPage {
    #[serde(rename = "search-results", default)]
    pub results: SearchResults,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResults {
    #[serde(rename = "opensearch:totalResults", default)]
    pub total_results: Option<String>,
    #[serde(default)]
    pub entry: Vec<ScienceDirectEntry>,
}

impl SearchPage {
    /// Entries of this page. An "empty result" marker entry counts as no entries.
    pub fn into_entries(self) -> Vec<ScienceDirectEntry> {
        self.results
            .entry
            .into_iter()
            .filter(|e| e.error.is_none())
            .collect()
    }
}

/// Raw search entry as returned by the API.
///
/// Scalars decode leniently: an unexpected shape becomes `None` rather than
/// failing the page.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScienceDirectEntry {
    #[serde(rename = "dc:title", default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(rename = "prism:doi", default, deserialize_with = "lenient::string")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub pii: Option<String>,
    /// `{"author": [{"authname": ..}]}`, sometimes a single object
    #[serde(default)]
    pub authors: Option<serde_json::Value>,
    #[serde(
        rename = "prism:publicationName",
        default,
        deserialize_with = "lenient::string"
    )]
    pub publication_name: Option<String>,
    #[serde(rename = "prism:coverDate", default, deserialize_with = "lenient::string")]
    pub cover_date: Option<String>,
    /// Boolean, or `"true"`/`"1"` depending on API version
    #[serde(default)]
    pub openaccess: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub link: Vec<EntryLink>,
    /// Present only on the marker entry of an empty result set
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EntryLink {
    #[serde(rename = "@ref", default, deserialize_with = "lenient::string")]
    pub rel: Option<String>,
    #[serde(rename = "@href", default, deserialize_with = "lenient::string")]
    pub href: Option<String>,
}

/// ScienceDirect API client
pub struct ScienceDirectClient {
    client: reqwest::Client,
    base_url: String,
    pacing: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
struct PageCursor {
    start: usize,
    fetched: usize,
    requests: usize,
}

impl ScienceDirectClient {
    /// Create a client. Fails with a configuration error if no API key is set.
    pub fn new(config: &ScienceDirectConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-els-apikey"),
            secret_header("ELSEVIER_API_KEY", api_key)?,
        );
        if let Some(token) = &config.insttoken {
            headers.insert(
                HeaderName::from_static("x-els-insttoken"),
                secret_header("ELSEVIER_INSTTOKEN", token)?,
            );
        }

        let user_agent = format!("bibingest/{}", env!("CARGO_PKG_VERSION"));
        Ok(Self {
            client: build_client(&user_agent, config.timeout, headers)?,
            base_url: config.base_url.clone(),
            pacing: config.pacing,
        })
    }

    /// Fetch one page of results starting at `start`.
    pub async fn search(&self, query: &str, count: usize, start: usize) -> Result<SearchPage> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let count = count.min(MAX_PAGE_SIZE).to_string();
        let start = start.to_string();

        debug!(query = query, count = %count, start = %start, "Fetching ScienceDirect page");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("count", count.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .await?;

        read_json(response).await
    }

    /// Lazily page through results until `max_records` entries or an empty page.
    pub fn iterate<'a>(
        &'a self,
        query: &'a str,
        max_records: usize,
    ) -> impl Stream<Item = Result<ScienceDirectEntry>> + 'a {
        stream::try_unfold(PageCursor::default(), move |cursor| {
            self.next_page(query, max_records, cursor)
        })
        .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, IngestError>)))
        .try_flatten()
    }

    async fn next_page(
        &self,
        query: &str,
        max_records: usize,
        cursor: PageCursor,
    ) -> Result<Option<(Vec<ScienceDirectEntry>, PageCursor)>> {
        if cursor.fetched >= max_records {
            return Ok(None);
        }
        if cursor.requests > 0 {
            tokio::time::sleep(self.pacing).await;
        }

        let remaining = max_records - cursor.fetched;
        let page = self.search(query, remaining, cursor.start).await?;
        let mut entries = page.into_entries();
        if entries.is_empty() {
            info!(fetched = cursor.fetched, "ScienceDirect results exhausted");
            return Ok(None);
        }

        let returned = entries.len();
        entries.truncate(remaining);
        let next = PageCursor {
            start: cursor.start + returned,
            fetched: cursor.fetched + entries.len(),
            requests: cursor.requests + 1,
        };
        debug!(returned = returned, fetched = next.fetched, "ScienceDirect page received");

        Ok(Some((entries, next)))
    }

    /// Fetch the raw metadata document for one article.
    pub async fn article_meta(&self, pii: &str, view: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}/{}", self.base_url, ARTICLE_PII_PATH, pii.trim());
        let response = self
            .client
            .get(&url)
            .query(&[("view", view)])
            .send()
            .await?;
        read_json(response).await
    }

    /// Collect `iterate` into a vector, logging the total.
    pub async fn collect(&self, query: &str, max_records: usize) -> Result<Vec<ScienceDirectEntry>> {
        let entries: Vec<ScienceDirectEntry> = self.iterate(query, max_records).try_collect().await?;
        info!(count = entries.len(), "ScienceDirect fetch complete");
        Ok(entries)
    }
}

impl std::fmt::Debug for ScienceDirectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScienceDirectClient")
            .field("base_url", &self.base_url)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}
