//! Per-run CSV snapshot under `data/<YYYY>/<MM>/<YYYY-MM-DD-HHMM>.csv`.

use crate::models::AvailabilityRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header row, in order
pub const COLUMNS: [&str; 10] = [
    "check_timestamp",
    "walk_name",
    "place_id",
    "facility_name",
    "facility_id",
    "target_date",
    "total_capacity",
    "total_available",
    "booking_status",
    "price",
];

/// Directory a snapshot taken at `run_instant` goes into
pub fn snapshot_dir(data_dir: &Path, run_instant: &DateTime<Local>) -> PathBuf {
    data_dir
        .join(run_instant.format("%Y").to_string())
        .join(run_instant.format("%m").to_string())
}

/// File stem for a snapshot, to the minute
pub fn snapshot_stem(run_instant: &DateTime<Local>) -> String {
    run_instant.format("%Y-%m-%d-%H%M").to_string()
}

/// Stamp every record with `run_instant` and write them to a new CSV file.
///
/// Returns `None` without touching the disk when there is nothing to write.
/// An existing snapshot from the same minute is never overwritten: the new
/// one gets a `-1`, `-2`, ... suffix instead.
pub fn write_snapshot(
    data_dir: &Path,
    records: &mut [AvailabilityRecord],
    run_instant: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        info!("No records to save");
        return Ok(None);
    }

    let dir = snapshot_dir(data_dir, &run_instant);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create data directory: {:?}", dir))?;

    for record in records.iter_mut() {
        record.check_timestamp = Some(run_instant);
    }

    let (path, file) = create_unique(&dir, &snapshot_stem(&run_instant))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(COLUMNS)
        .with_context(|| format!("Failed to write header to {:?}", path))?;
    for record in records.iter() {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write record to {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush snapshot: {:?}", path))?;

    info!("✓ Saved {} records to {}", records.len(), path.display());
    Ok(Some(path))
}

fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.csv", stem)
        } else {
            format!("{}-{}.csv", stem, attempt)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                warn!("Snapshot {} already exists, not overwriting", path.display());
                attempt += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to create snapshot file: {:?}", path));
            }
        }
    }
}
