use crate::types::{ShotRecord, SimError};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Load the historical shot table
///
/// Expected columns: team, match_id, round, period, category, zone,
/// outcome, points. Category, zone and outcome use snake_case values
/// (`power_five`, `inner`, `made`, ...). Any malformed row aborts the
/// load; a partial season would silently skew every fitted
/// distribution downstream.
pub fn read_shot_records(path: &Path) -> Result<Vec<ShotRecord>, SimError> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    info!(path = %path.display(), records = records.len(), "loaded shot records");
    Ok(records)
}

/// Write a batch of rows as CSV with a header derived from the type
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), SimError> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote results");
    Ok(())
}
