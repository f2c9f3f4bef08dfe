//! Uniform fetch interface over the provider clients.
//!
//! The orchestrator only sees [`RecordSource`]: one call per source that
//! returns an owned batch of normalized records or an error.

use crate::crossref::CrossrefClient;
use crate::error::Result;
use crate::normalize::{entry_to_record, item_to_record};
use crate::record::{Record, Source};
use crate::sciencedirect::ScienceDirectClient;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::sync::Arc;

/// A provider that can be searched for normalized records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Which source tag this provider produces
    fn source(&self) -> Source;

    /// Fetch at most `limit` records for `query`.
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>>;
}

/// ScienceDirect search results.
#[derive(Debug)]
pub struct ScienceDirectSource {
    client: ScienceDirectClient,
}

impl ScienceDirectSource {
    pub fn new(client: ScienceDirectClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSource for ScienceDirectSource {
    fn source(&self) -> Source {
        Source::Sciencedirect
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>> {
        self.client
            .iterate(query, limit)
            .map_ok(|entry| entry_to_record(&entry))
            .try_collect()
            .await
    }
}

/// Crossref works of one publisher. Several publishers share a client.
#[derive(Debug)]
pub struct CrossrefPublisherSource {
    client: Arc<CrossrefClient>,
    source: Source,
    publisher: String,
}

impl CrossrefPublisherSource {
    /// Source for a Crossref-backed [`Source`] using its default publisher name.
    pub fn for_source(client: Arc<CrossrefClient>, source: Source) -> Option<Self> {
        source
            .crossref_publisher()
            .map(|publisher| Self::new(client, source, publisher))
    }

    pub fn new(client: Arc<CrossrefClient>, source: Source, publisher: impl Into<String>) -> Self {
        Self {
            client,
            source,
            publisher: publisher.into(),
        }
    }
}

#[async_trait]
impl RecordSource for CrossrefPublisherSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>> {
        let items = self.client.search(query, &self.publisher, limit).await?;
        Ok(items
            .iter()
            .map(|item| item_to_record(item, self.source))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrossrefConfig;

    #[test]
    fn test_crossref_sources_only_for_publishers() {
        let client = Arc::new(CrossrefClient::new(&CrossrefConfig::default()).unwrap());
        assert!(CrossrefPublisherSource::for_source(client.clone(), Source::Sciencedirect).is_none());

        let acm = CrossrefPublisherSource::for_source(client, Source::Acm).unwrap();
        assert_eq!(acm.source(), Source::Acm);
        assert_eq!(acm.publisher, "Association for Computing Machinery");
    }
}
