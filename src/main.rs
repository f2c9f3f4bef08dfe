//! bibingest - Multi-source bibliographic ingestion
//!
//! Fetches ScienceDirect and Crossref (SAGE, ACM) search results, merges and
//! deduplicates them, and writes a combined CSV plus a removal log.
//!
//! ## Usage
//!
//! ```bash
//! bibingest ingest "generative artificial intelligence" --sources sciencedirect,sage,acm
//! bibingest dedupe data/raw/combined_20250823_230635.csv
//! bibingest article S0893608024000011
//! ```

use anyhow::{Context, Result};
use bibingest::crossref::PagingStrategy;
use bibingest::ingest::DEFAULT_PER_SOURCE;
use bibingest::sciencedirect::{ScienceDirectClient, DEFAULT_ARTICLE_VIEW};
use bibingest::{IngestConfig, IngestSummary, Ingestor, Source};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Multi-source bibliographic ingestion and deduplication
#[derive(Parser)]
#[command(name = "bibingest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Output directory (overrides BIBINGEST_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the enabled sources, dedupe, and write the artifacts
    Ingest {
        /// Search query (enclosing quotes are stripped)
        query: String,

        /// Sources to query
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = Source::FAN_OUT)]
        sources: Vec<Source>,

        /// Maximum records fetched per source
        #[arg(long, default_value_t = DEFAULT_PER_SOURCE)]
        per_source: usize,

        /// Crossref paging strategy (overrides CROSSREF_PAGING)
        #[arg(long, value_enum)]
        crossref_paging: Option<PagingStrategy>,
    },

    /// Re-run deduplication over an existing combined CSV
    Dedupe {
        /// Combined CSV produced by `ingest`
        input: PathBuf,
    },

    /// Print the ScienceDirect metadata document for one article
    Article {
        /// Publisher Item Identifier
        pii: String,

        /// Elsevier view name
        #[arg(long, default_value = DEFAULT_ARTICLE_VIEW)]
        view: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.debug, cli.json_logs);

    let mut config = IngestConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.output {
        config.output_dir = dir;
    }

    match cli.command {
        Commands::Ingest {
            query,
            sources,
            per_source,
            crossref_paging,
        } => {
            if let Some(paging) = crossref_paging {
                config.crossref.paging = paging;
            }
            run_ingest(&config, &query, &sources, per_source).await
        }
        Commands::Dedupe { input } => run_dedupe(&config, input),
        Commands::Article { pii, view } => run_article(&config, &pii, &view).await,
    }
}

fn init_logging(debug: bool, json: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_ingest(
    config: &IngestConfig,
    query: &str,
    sources: &[Source],
    per_source: usize,
) -> Result<()> {
    let ingestor = Ingestor::from_config(config).context("Failed to set up sources")?;

    let summary = ingestor
        .run(query, sources, per_source)
        .await
        .context("Failed to write ingest artifacts")?;

    print_summary(&summary)
}

fn run_dedupe(config: &IngestConfig, input: PathBuf) -> Result<()> {
    let ingestor = Ingestor::new(config.output_dir.clone());
    let summary = ingestor
        .dedupe_file(&input)
        .with_context(|| format!("Failed to dedupe {}", input.display()))?;

    print_summary(&summary)
}

async fn run_article(config: &IngestConfig, pii: &str, view: &str) -> Result<()> {
    let client = ScienceDirectClient::new(&config.sciencedirect)
        .context("ScienceDirect client unavailable")?;

    let doc = client
        .article_meta(pii, view)
        .await
        .with_context(|| format!("Failed to fetch article {pii}"))?;

    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn print_summary(summary: &IngestSummary) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(summary).context("Failed to render summary")?
    );
    Ok(())
}
