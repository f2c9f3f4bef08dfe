//! Unified bibliographic record shared by every source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Elsevier ScienceDirect search API
    Sciencedirect,
    /// SAGE Publications, via Crossref
    Sage,
    /// Association for Computing Machinery, via Crossref
    Acm,
}

impl Source {
    /// Fixed fan-out order used by the orchestrator.
    pub const FAN_OUT: [Source; 3] = [Source::Sciencedirect, Source::Sage, Source::Acm];

    /// Identifier used in CSV rows and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Sciencedirect => "sciencedirect",
            Source::Sage => "sage",
            Source::Acm => "acm",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Source::Sciencedirect => "ScienceDirect",
            Source::Sage => "SAGE/Crossref",
            Source::Acm => "ACM/Crossref",
        }
    }

    /// Publisher name to filter Crossref by, for Crossref-backed sources.
    pub fn crossref_publisher(self) -> Option<&'static str> {
        match self {
            Source::Sciencedirect => None,
            Source::Sage => Some("SAGE Publications"),
            Source::Acm => Some("Association for Computing Machinery"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sciencedirect" => Ok(Source::Sciencedirect),
            "sage" => Ok(Source::Sage),
            "acm" => Ok(Source::Acm),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// CSV column order for combined output
pub const RECORD_COLUMNS: &[&str] = &[
    "source",
    "title",
    "doi",
    "pii",
    "authors",
    "container_title",
    "published",
    "openaccess",
    "url",
    "abstract",
];

/// One normalized row. Field order matches [`RECORD_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub source: Source,
    pub title: Option<String>,
    pub doi: Option<String>,
    /// Publisher Item Identifier (ScienceDirect only)
    pub pii: Option<String>,
    /// `"Given Family"` names joined by `"; "`
    pub authors: Option<String>,
    pub container_title: Option<String>,
    /// Year or full date, as the provider reports it
    pub published: Option<String>,
    /// Open-access flag (ScienceDirect only)
    pub openaccess: Option<bool>,
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

impl Record {
    /// Empty record tagged with its source.
    pub fn new(source: Source) -> Self {
        Self {
            source,
            title: None,
            doi: None,
            pii: None,
            authors: None,
            container_title: None,
            published: None,
            openaccess: None,
            url: None,
            abstract_text: None,
        }
    }
}
