//! Crossref REST API client for publisher-scoped searches.
//!
//! Publishers are resolved to a Crossref member id first; the `member:<id>`
//! filter is much more reliable than matching on the free-text
//! publisher name. Pagination is pluggable: Crossref supports deep paging
//! with an opaque cursor as well as plain offsets.

use crate::config::CrossrefConfig;
use crate::error::{IngestError, Result};
use crate::http::{build_client, read_json};
use crate::lenient;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const WORKS_PATH: &str = "/works";
const MEMBERS_PATH: &str = "/members";

/// Maximum `rows` per works request
pub const MAX_ROWS: usize = 100;

/// Candidates requested from the members endpoint
const MEMBER_CANDIDATES: usize = 20;

/// Contact used in the User-Agent when no mailto is configured
const FALLBACK_CONTACT: &str = "mailto:contact@example.com";

/// Fields requested for each work
const WORK_FIELDS: &str = "DOI,title,author,issued,container-title,link,abstract,publisher,type";

// === Pagination ===

/// Paging scheme used against the works endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PagingStrategy {
    /// Deep paging with `cursor=*` and `next-cursor`
    #[default]
    Cursor,
    /// Numeric `offset`
    Offset,
}

impl PagingStrategy {
    /// Fresh paginator positioned at the first page.
    pub fn paginator(self) -> Box<dyn Paginator> {
        match self {
            PagingStrategy::Cursor => Box::new(CursorPaginator::default()),
            PagingStrategy::Offset => Box::new(OffsetPaginator::default()),
        }
    }
}

impl fmt::Display for PagingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagingStrategy::Cursor => f.write_str("cursor"),
            PagingStrategy::Offset => f.write_str("offset"),
        }
    }
}

impl FromStr for PagingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cursor" => Ok(PagingStrategy::Cursor),
            "offset" => Ok(PagingStrategy::Offset),
            other => Err(format!("unknown Crossref paging strategy: {other}")),
        }
    }
}

/// Position within a paged works query.
pub trait Paginator: Send {
    /// Query parameters locating the next page.
    fn params(&self) -> Vec<(&'static str, String)>;

    /// Record a received (non-empty) page. Returns `false` when no further
    /// page can be requested.
    fn advance(&mut self, page: &WorksMessage) -> bool;
}

/// Cursor-based deep paging.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    cursor: String,
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self {
            cursor: "*".to_string(),
        }
    }
}

impl Paginator for CursorPaginator {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![("cursor", self.cursor.clone())]
    }

    fn advance(&mut self, page: &WorksMessage) -> bool {
        match page.next_cursor.as_deref().filter(|c| !c.is_empty()) {
            Some(next) => {
                self.cursor = next.to_string();
                true
            }
            None => false,
        }
    }
}

/// Offset-based paging.
#[derive(Debug, Clone, Default)]
pub struct OffsetPaginator {
    offset: usize,
}

impl Paginator for OffsetPaginator {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![("offset", self.offset.to_string())]
    }

    fn advance(&mut self, page: &WorksMessage) -> bool {
        self.offset += page.items.len();
        true
    }
}

// === Crossref API Response Types ===

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

/// `message` object of a works page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksMessage {
    #[serde(default)]
    pub items: Vec<CrossrefItem>,
    #[serde(rename = "next-cursor", default)]
    pub next_cursor: Option<String>,
    #[serde(rename = "total-results", default)]
    pub total_results: Option<u64>,
}

/// Raw work item. Fields with an unexpected shape decode as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefItem {
    #[serde(rename = "DOI", default, deserialize_with = "lenient::string")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub title: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub author: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title", default, deserialize_with = "lenient::strings")]
    pub container_title: Vec<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub issued: Option<CrossrefDate>,
    #[serde(rename = "abstract", default, deserialize_with = "lenient::string")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub link: Vec<CrossrefLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefAuthor {
    #[serde(default, deserialize_with = "lenient::string")]
    pub given: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub family: Option<String>,
    /// Organisational authors carry only a name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefLink {
    #[serde(rename = "URL", default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(
        rename = "intended-application",
        default,
        deserialize_with = "lenient::string"
    )]
    pub intended_application: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    message: MembersMessage,
}

#[derive(Debug, Deserialize)]
struct MembersMessage {
    #[serde(default)]
    items: Vec<MemberCandidate>,
}

/// Publisher candidate from the members endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberCandidate {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub id: Option<u64>,
    #[serde(rename = "primary-name", default, deserialize_with = "lenient::string")]
    pub primary_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
}

/// How a works query is scoped to a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherFilter {
    Member(u64),
    /// Fallback when member resolution fails
    Name(String),
}

impl PublisherFilter {
    fn as_param(&self) -> String {
        match self {
            PublisherFilter::Member(id) => format!("member:{id}"),
            PublisherFilter::Name(name) => format!("publisher-name:{name}"),
        }
    }
}

/// Crossref API client
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    pacing: Duration,
    paging: PagingStrategy,
}

impl CrossrefClient {
    /// Create a new CrossrefClient
    pub fn new(config: &CrossrefConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&user_agent(config), config.timeout, HeaderMap::new())?,
            base_url: config.base_url.clone(),
            mailto: config.mailto.clone(),
            pacing: config.pacing,
            paging: config.paging,
        })
    }

    /// Paging strategy this client was configured with.
    pub fn paging(&self) -> PagingStrategy {
        self.paging
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(&params).send().await?;
        read_json(response).await
    }

    /// Resolve a publisher name to its best-matching member id.
    pub async fn resolve_member_id(&self, publisher: &str) -> Result<u64> {
        let data: MembersResponse = self
            .get(
                MEMBERS_PATH,
                vec![
                    ("query", publisher.to_string()),
                    ("rows", MEMBER_CANDIDATES.to_string()),
                ],
            )
            .await?;

        best_member(publisher, &data.message.items)
            .ok_or_else(|| IngestError::LookupFailure(publisher.to_string()))
    }

    /// Member filter if resolvable, publisher-name filter otherwise.
    pub async fn publisher_filter(&self, publisher: &str) -> PublisherFilter {
        match self.resolve_member_id(publisher).await {
            Ok(id) => {
                debug!(publisher = publisher, member = id, "Resolved Crossref member");
                PublisherFilter::Member(id)
            }
            Err(e) => {
                warn!(publisher = publisher, error = %e, "Member lookup failed, filtering by publisher name");
                PublisherFilter::Name(publisher.to_string())
            }
        }
    }

    /// Search works by `publisher`, returning at most `max_records` raw items.
    pub async fn search(
        &self,
        query: &str,
        publisher: &str,
        max_records: usize,
    ) -> Result<Vec<CrossrefItem>> {
        let filter = self.publisher_filter(publisher).await;
        self.search_filtered(query, &filter, max_records).await
    }

    /// Page through works matching `query` under `filter`.
    pub async fn search_filtered(
        &self,
        query: &str,
        filter: &PublisherFilter,
        max_records: usize,
    ) -> Result<Vec<CrossrefItem>> {
        info!(
            query = query,
            filter = %filter.as_param(),
            paging = %self.paging,
            max_records = max_records,
            "Starting Crossref search"
        );

        let mut paginator = self.paging.paginator();
        let mut items: Vec<CrossrefItem> = Vec::new();
        let mut requests = 0usize;

        while items.len() < max_records {
            if requests > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            let rows = (max_records - items.len()).min(MAX_ROWS);
            let mut params = vec![
                ("query.bibliographic", query.to_string()),
                ("filter", filter.as_param()),
                ("rows", rows.to_string()),
                ("select", WORK_FIELDS.to_string()),
            ];
            params.extend(paginator.params());

            let page: WorksResponse = self.get(WORKS_PATH, params).await?;
            requests += 1;

            let message = page.message;
            if message.items.is_empty() {
                break;
            }
            let more = paginator.advance(&message);
            debug!(
                page = requests,
                returned = message.items.len(),
                total = ?message.total_results,
                "Crossref page received"
            );
            items.extend(message.items);
            if !more {
                break;
            }
        }

        items.truncate(max_records);
        info!(count = items.len(), requests = requests, "Crossref search complete");
        Ok(items)
    }
}

impl fmt::Debug for CrossrefClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossrefClient")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}

fn user_agent(config: &CrossrefConfig) -> String {
    let contact = config
        .mailto
        .as_ref()
        .map(|m| format!("mailto:{m}"))
        .unwrap_or_else(|| FALLBACK_CONTACT.to_string());
    format!(
        "bibingest/{} ({}); env={}",
        env!("CARGO_PKG_VERSION"),
        contact,
        config.app_env
    )
}

/// Score a candidate name against the wanted publisher.
///
/// Exact match beats containment, which beats shared tokens.
pub fn member_score(publisher: &str, candidate: &str) -> usize {
    let wanted = publisher.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let name = candidate.to_lowercase();

    if wanted == name {
        100
    } else if !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name)) {
        80
    } else {
        let tokens: std::collections::HashSet<&str> = wanted.split_whitespace().collect();
        name.split_whitespace()
            .collect::<std::collections::HashSet<&str>>()
            .intersection(&tokens)
            .count()
    }
}

/// Highest-scoring candidate id; the first one wins ties.
pub fn best_member(publisher: &str, candidates: &[MemberCandidate]) -> Option<u64> {
    let mut best: Option<(usize, u64)> = None;
    for candidate in candidates {
        let Some(id) = candidate.id else { continue };
        let name = candidate
            .primary_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(candidate.name.as_deref())
            .unwrap_or_default();
        let score = member_score(publisher, name);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, id));
        }
    }
    best.map(|(_, id)| id)
}
