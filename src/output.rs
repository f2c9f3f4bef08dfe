//! Timestamped run artifacts: combined CSV and removal log.

use crate::error::Result;
use crate::record::Record;
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp format shared by both artifacts of a run
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths of the two files for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub csv: PathBuf,
    pub removed_log: PathBuf,
}

impl RunArtifacts {
    /// `combined_<stamp>.csv` and `dedupe_removed_<stamp>.json` under `dir`.
    pub fn new(dir: &Path, stamp: &str) -> Self {
        Self {
            csv: dir.join(format!("combined_{stamp}.csv")),
            removed_log: dir.join(format!("dedupe_removed_{stamp}.json")),
        }
    }

    /// Artifacts stamped with the current local time.
    pub fn now(dir: &Path) -> Self {
        Self::new(dir, &Local::now().format(STAMP_FORMAT).to_string())
    }
}

/// Write kept rows as CSV with a header row. Nothing is written for zero rows.
///
/// Returns whether a file was created.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<bool> {
    if records.is_empty() {
        info!(path = %path.display(), "No rows to save, skipping CSV");
        return Ok(false);
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = records.len(), "Saved CSV");
    Ok(true)
}

/// Write removed rows as a pretty-printed JSON array (possibly empty).
pub fn write_removed_log(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "Saved removal log");
    Ok(())
}

/// Read a combined CSV back into records.
pub fn read_csv(path: &Path) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let records = rdr.deserialize().collect::<std::result::Result<Vec<Record>, _>>()?;
    Ok(records)
}
