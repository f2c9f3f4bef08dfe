//! # bibingest
//!
//! Multi-source bibliographic ingestion: ScienceDirect and Crossref (SAGE,
//! ACM) search results are normalized into one record shape, deduplicated by
//! DOI or normalized title, and written out for a relational loader.
//!
//! ## Modules
//!
//! - [`sciencedirect`] - Elsevier search API client (offset paging)
//! - [`crossref`] - Crossref works client (cursor or offset paging)
//! - [`normalize`] - Provider items to [`Record`]
//! - [`dedupe`](mod@dedupe) - DOI/title deduplication
//! - [`sources`] - Uniform per-source fetch trait
//! - [`ingest`] - Orchestrator and run summary
//! - [`output`] - CSV and removal-log artifacts
//! - [`config`] - Startup configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bibingest::{IngestConfig, Ingestor, Source};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let ingestor = Ingestor::from_config(&config)?;
//!     let summary = ingestor
//!         .run("\"generative ai\"", &[Source::Sciencedirect, Source::Acm], 300)
//!         .await?;
//!     println!("{} rows kept", summary.total_after_dedupe);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crossref;
pub mod dedupe;
pub mod error;
mod http;
mod lenient;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod record;
pub mod sciencedirect;
pub mod sources;

pub use config::IngestConfig;
pub use dedupe::{dedupe, Deduplicated};
pub use error::{IngestError, Result};
pub use ingest::{IngestSummary, Ingestor};
pub use record::{Record, Source};
