//! Ingestion orchestrator.
//!
//! A run is one linear pass: fetch every requested source in fan-out order,
//! dedupe the concatenated rows, then write the artifacts. A failing source
//! is reported in the summary and does not stop the others.

use crate::config::IngestConfig;
use crate::crossref::CrossrefClient;
use crate::dedupe::dedupe;
use crate::error::Result;
use crate::output::{read_csv, write_csv, write_removed_log, RunArtifacts};
use crate::record::{Record, Source};
use crate::sciencedirect::ScienceDirectClient;
use crate::sources::{CrossrefPublisherSource, RecordSource, ScienceDirectSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Default cap on records fetched per source
pub const DEFAULT_PER_SOURCE: usize = 300;

/// Outcome of one run, as handed to downstream loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub query: String,
    pub sources: Vec<Source>,
    pub total_raw: usize,
    pub total_after_dedupe: usize,
    pub duplicates_removed: usize,
    /// Empty when no rows survived
    pub out_csv: String,
    pub log_json: String,
    pub errors: Vec<String>,
}

/// Fans a query out to registered sources and persists the merged result.
pub struct Ingestor {
    output_dir: PathBuf,
    sources: Vec<Box<dyn RecordSource>>,
    /// Reason a source could not be registered (e.g. missing credential)
    unavailable: HashMap<Source, String>,
}

impl Ingestor {
    /// Empty orchestrator writing to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sources: Vec::new(),
            unavailable: HashMap::new(),
        }
    }

    /// Orchestrator with every source the configuration allows.
    ///
    /// ScienceDirect is marked unavailable rather than failing when its API key
    /// is missing.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let mut ingestor = Self::new(config.output_dir.clone());

        match ScienceDirectClient::new(&config.sciencedirect) {
            Ok(client) => ingestor.register(Box::new(ScienceDirectSource::new(client))),
            Err(e) => {
                info!(error = %e, "ScienceDirect unavailable");
                ingestor.mark_unavailable(
                    Source::Sciencedirect,
                    "ScienceDirect skipped: ELSEVIER_API_KEY missing or placeholder",
                );
            }
        }

        let crossref = Arc::new(CrossrefClient::new(&config.crossref)?);
        for source in [Source::Sage, Source::Acm] {
            if let Some(s) = CrossrefPublisherSource::for_source(crossref.clone(), source) {
                ingestor.register(Box::new(s));
            }
        }

        Ok(ingestor)
    }

    /// Add a source, replacing any earlier one with the same tag.
    pub fn register(&mut self, source: Box<dyn RecordSource>) {
        let tag = source.source();
        self.sources.retain(|s| s.source() != tag);
        self.unavailable.remove(&tag);
        self.sources.push(source);
    }

    /// Record why `source` cannot be queried in this run.
    pub fn mark_unavailable(&mut self, source: Source, note: impl Into<String>) {
        self.sources.retain(|s| s.source() != source);
        self.unavailable.insert(source, note.into());
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetch, dedupe and persist records for `query` from `requested` sources.
    pub async fn run(
        &self,
        query: &str,
        requested: &[Source],
        per_source: usize,
    ) -> Result<IngestSummary> {
        let clean_query = strip_quotes(query);
        info!(query = clean_query, sources = ?requested, per_source = per_source, "Starting ingest");

        let mut batches: Vec<Vec<Record>> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for tag in Source::FAN_OUT.into_iter().filter(|s| requested.contains(s)) {
            let Some(source) = self.sources.iter().find(|s| s.source() == tag) else {
                let note = self
                    .unavailable
                    .get(&tag)
                    .cloned()
                    .unwrap_or_else(|| format!("{} skipped: source not configured", tag.label()));
                warn!(source = %tag, note = %note, "Source skipped");
                errors.push(note);
                continue;
            };

            match source.fetch(clean_query, per_source).await {
                Ok(batch) => {
                    info!(source = %tag, count = batch.len(), "Source fetched");
                    batches.push(batch);
                }
                Err(e) => {
                    warn!(source = %tag, error = %e, "Source failed");
                    errors.push(format!("{}: {}", tag.label(), e));
                }
            }
        }

        let rows: Vec<Record> = batches.into_iter().flatten().collect();
        let mut summary = self.persist(rows)?;
        summary.query = query.to_string();
        summary.sources = requested.to_vec();
        summary.errors = errors;

        info!(
            total_raw = summary.total_raw,
            kept = summary.total_after_dedupe,
            removed = summary.duplicates_removed,
            errors = summary.errors.len(),
            "Ingest complete"
        );
        Ok(summary)
    }

    /// Re-run deduplication over an existing combined CSV.
    pub fn dedupe_file(&self, input: &Path) -> Result<IngestSummary> {
        let rows = read_csv(input)?;
        let mut sources: Vec<Source> = Vec::new();
        for row in &rows {
            if !sources.contains(&row.source) {
                sources.push(row.source);
            }
        }

        let mut summary = self.persist(rows)?;
        summary.query = input.display().to_string();
        summary.sources = sources;
        Ok(summary)
    }

    fn persist(&self, rows: Vec<Record>) -> Result<IngestSummary> {
        let total_raw = rows.len();
        let deduped = dedupe(rows);

        std::fs::create_dir_all(&self.output_dir)?;
        let artifacts = RunArtifacts::now(&self.output_dir);

        let out_csv = if write_csv(&artifacts.csv, &deduped.kept)? {
            artifacts.csv.display().to_string()
        } else {
            String::new()
        };
        write_removed_log(&artifacts.removed_log, &deduped.removed)?;

        Ok(IngestSummary {
            query: String::new(),
            sources: Vec::new(),
            total_raw,
            total_after_dedupe: deduped.kept.len(),
            duplicates_removed: deduped.removed.len(),
            out_csv,
            log_json: artifacts.removed_log.display().to_string(),
            errors: Vec::new(),
        })
    }
}

/// Trim, then drop one pair of matching enclosing quotes.
pub fn strip_quotes(query: &str) -> &str {
    let trimmed = query.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Source returning canned rows and remembering the queries it saw.
    struct FakeSource {
        tag: Source,
        rows: std::result::Result<Vec<Record>, String>,
        seen: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl FakeSource {
        fn ok(tag: Source, rows: Vec<Record>) -> Self {
            Self {
                tag,
                rows: Ok(rows),
                seen: Arc::default(),
            }
        }

        fn failing(tag: Source, message: &str) -> Self {
            Self {
                tag,
                rows: Err(message.to_string()),
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        fn source(&self) -> Source {
            self.tag
        }

        async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>> {
            self.seen.lock().unwrap().push((query.to_string(), limit));
            match &self.rows {
                Ok(rows) => Ok(rows.iter().take(limit).cloned().collect()),
                Err(msg) => Err(IngestError::http(503, "https://fake.test/works", msg)),
            }
        }
    }

    fn rec(source: Source, doi: Option<&str>, title: Option<&str>) -> Record {
        let mut r = Record::new(source);
        r.doi = doi.map(str::to_string);
        r.title = title.map(str::to_string);
        r
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"generative ai\""), "generative ai");
        assert_eq!(strip_quotes("  'graph theory' "), "graph theory");
        assert_eq!(strip_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(strip_quotes("\"mixed'"), "\"mixed'");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\""), "\"");
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut ingestor = Ingestor::new(dir.path());
        ingestor.register(Box::new(FakeSource::failing(Source::Sage, "down")));
        ingestor.register(Box::new(FakeSource::ok(
            Source::Acm,
            vec![
                rec(Source::Acm, Some("10.1145/1"), Some("One")),
                rec(Source::Acm, Some("10.1145/2"), Some("Two")),
            ],
        )));

        let summary = ingestor
            .run("q", &[Source::Sage, Source::Acm], 10)
            .await
            .unwrap();

        assert_eq!(summary.total_raw, 2);
        assert_eq!(summary.total_after_dedupe, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("SAGE/Crossref: "));
        assert!(summary.errors[0].contains("down"));
        assert!(!summary.out_csv.is_empty());
    }

    #[tokio::test]
    async fn test_zero_kept_rows_writes_only_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut ingestor = Ingestor::new(dir.path());
        ingestor.register(Box::new(FakeSource::ok(Source::Sage, vec![])));

        let summary = ingestor.run("q", &[Source::Sage], 10).await.unwrap();

        assert_eq!(summary.out_csv, "");
        assert_eq!(summary.total_raw, 0);
        let log = std::fs::read_to_string(&summary.log_json).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Record>>(&log).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_fan_out_order_and_cross_source_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        let mut ingestor = Ingestor::new(dir.path());
        ingestor.register(Box::new(FakeSource::ok(
            Source::Acm,
            vec![rec(Source::Acm, Some("10.1/SHARED"), Some("From ACM"))],
        )));
        ingestor.register(Box::new(FakeSource::ok(
            Source::Sciencedirect,
            vec![rec(Source::Sciencedirect, Some("10.1/shared"), Some("From SD"))],
        )));

        // Requested order does not change fan-out order.
        let summary = ingestor
            .run("q", &[Source::Acm, Source::Sciencedirect], 10)
            .await
            .unwrap();

        assert_eq!(summary.sources, vec![Source::Acm, Source::Sciencedirect]);
        assert_eq!(summary.duplicates_removed, 1);
        let kept = read_csv(Path::new(&summary.out_csv)).unwrap();
        assert_eq!(kept[0].title.as_deref(), Some("From SD"));
        let removed: Vec<Record> =
            serde_json::from_str(&std::fs::read_to_string(&summary.log_json).unwrap()).unwrap();
        assert_eq!(removed[0].title.as_deref(), Some("From ACM"));
    }

    #[tokio::test]
    async fn test_query_is_unquoted_and_limit_passed() {
        let dir = tempfile::tempdir().unwrap();
        let mut ingestor = Ingestor::new(dir.path());
        let fake = FakeSource::ok(Source::Sage, vec![rec(Source::Sage, None, Some("T"))]);
        let seen = Arc::clone(&fake.seen);
        ingestor.register(Box::new(fake));

        let summary = ingestor
            .run("\"generative ai\"", &[Source::Sage], 42)
            .await
            .unwrap();

        assert_eq!(summary.query, "\"generative ai\"");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("generative ai".to_string(), 42)]
        );
    }

    #[tokio::test]
    async fn test_unavailable_source_is_noted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ingestor = Ingestor::new(dir.path());
        ingestor.mark_unavailable(Source::Sciencedirect, "ScienceDirect skipped: no key");

        let summary = ingestor
            .run("q", &[Source::Sciencedirect, Source::Acm], 10)
            .await
            .unwrap();

        assert_eq!(
            summary.errors,
            vec![
                "ScienceDirect skipped: no key".to_string(),
                "ACM/Crossref skipped: source not configured".to_string(),
            ]
        );
        assert_eq!(summary.total_raw, 0);
    }

    #[tokio::test]
    async fn test_from_config_without_key_skips_sciencedirect() {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ingestor = Ingestor::from_config(&config).unwrap();

        assert!(ingestor
            .sources
            .iter()
            .all(|s| s.source() != Source::Sciencedirect));
        assert_eq!(
            ingestor.unavailable.get(&Source::Sciencedirect).map(String::as_str),
            Some("ScienceDirect skipped: ELSEVIER_API_KEY missing or placeholder")
        );

        // No network is touched when only ScienceDirect is requested.
        let summary = ingestor.run("q", &[Source::Sciencedirect], 5).await.unwrap();
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.out_csv, "");
    }

    #[test]
    fn test_dedupe_file_removes_nothing_from_deduped_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        write_csv(
            &input,
            &[
                rec(Source::Sage, Some("10.1/a"), None),
                rec(Source::Acm, None, Some("Title")),
            ],
        )
        .unwrap();

        let ingestor = Ingestor::new(dir.path().join("out"));
        let summary = ingestor.dedupe_file(&input).unwrap();
        assert_eq!(summary.total_raw, 2);
        assert_eq!(summary.duplicates_removed, 0);
        assert_eq!(summary.sources, vec![Source::Sage, Source::Acm]);
    }
}
