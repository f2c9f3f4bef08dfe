//! Order-sensitive deduplication of records.
//!
//! Each record gets at most one key: its normalized DOI, or failing that its
//! normalized title. The first record to claim a key is kept and every later
//! record with an equal key is moved to `removed`.
//!
//! DOI keys and title keys are separate namespaces. A record keyed by title
//! is never compared against DOI-keyed records, even if a DOI-keyed record
//! happens to have the same title.

use crate::record::Record;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Anything outside the allowed title alphabet (whitespace is kept here and
/// collapsed afterwards)
static TITLE_DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9\s:;,.\-()\[\]{}]").expect("title filter regex is valid")
});

/// Identity used to decide whether two records are the same work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Doi(String),
    Title(String),
}

/// Result of [`dedupe`]: survivors and displaced records, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduplicated {
    pub kept: Vec<Record>,
    pub removed: Vec<Record>,
}

/// Lowercase and trim a DOI.
pub fn normalize_doi(doi: &str) -> String {
    doi.trim().to_lowercase()
}

/// Lowercase, strip characters outside `[a-z0-9 :;,.-()[]{}]`, collapse
/// whitespace and trim.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let filtered = TITLE_DISALLOWED.replace_all(&lowered, "");
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key for a record, or `None` if it has neither DOI nor usable title.
pub fn dedup_key(record: &Record) -> Option<DedupKey> {
    let doi = record.doi.as_deref().map(normalize_doi).unwrap_or_default();
    if !doi.is_empty() {
        return Some(DedupKey::Doi(doi));
    }

    let title = record
        .title
        .as_deref()
        .map(normalize_title)
        .unwrap_or_default();
    if !title.is_empty() {
        return Some(DedupKey::Title(title));
    }

    None
}

/// Split `records` into first occurrences and duplicates.
pub fn dedupe(records: Vec<Record>) -> Deduplicated {
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut out = Deduplicated::default();

    for record in records {
        match dedup_key(&record) {
            Some(key) if seen.contains(&key) => {
                debug!(key = ?key, source = %record.source, "Duplicate removed");
                out.removed.push(record);
            }
            Some(key) => {
                seen.insert(key);
                out.kept.push(record);
            }
            None => out.kept.push(record),
        }
    }

    out
}
