//! Result finalization and aggregation
//!
//! Turns the session's raw row strings into the structured calibration table,
//! persists it, and computes per-distance summaries for the operator report.
//! Malformed rows are dropped and counted, never silently lost at the
//! aggregate level. The checkpoint writer shares this parse/write path, which
//! is what makes every checkpoint a strict prefix of the final table.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::checkpoint;
use super::error::AcquisitionError;
use super::protocol::{parse_row, CalibrationRow, HEADER_LINE};
use super::session::AcquisitionSession;

/// Parsed calibration table plus the count of rows that failed parsing
#[derive(Debug, Clone, Default)]
pub struct CalibrationTable {
    /// Accepted rows, configuration-then-arrival ordered
    pub rows: Vec<CalibrationRow>,
    /// Raw rows dropped for wrong field count or non-numeric fields
    pub dropped: usize,
}

impl CalibrationTable {
    /// Parse a session's accumulated raw rows
    ///
    /// Rows are ordered primarily by the configured distance order,
    /// secondarily by arrival order within each distance. A row whose
    /// distance is not in the schedule keeps its arrival position at the end.
    pub fn from_session(session: &AcquisitionSession) -> Self {
        let mut table = Self::default();
        for raw in session.raw_rows() {
            match parse_row(raw) {
                Ok(row) => table.rows.push(row),
                Err(e) => {
                    debug!("dropping malformed row {raw:?}: {e}");
                    table.dropped += 1;
                }
            }
        }

        let targets = session.target_distances();
        let rank = |row: &CalibrationRow| {
            targets
                .iter()
                .position(|d| *d == row.distance_cm)
                .unwrap_or(usize::MAX)
        };
        table.rows.sort_by_key(rank);
        table
    }
}

/// Write rows as a CSV table with the protocol header
///
/// The header is written even for an empty table so the artifact is
/// well-formed regardless of how the session ended.
pub fn write_table(path: &Path, rows: &[CalibrationRow]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(HEADER_LINE.split(','))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-distance summary statistics
///
/// Pure function of the table; deviations use the sample (n−1) form and are
/// reported as zero for a single-row distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSummary {
    /// Distance this summary covers
    pub distance_cm: u32,
    /// Accepted row count
    pub count: usize,
    /// Mean and deviation of the left sensor
    pub left: (f64, f64),
    /// Mean and deviation of the right sensor
    pub right: (f64, f64),
    /// Mean and deviation of the averaged reading
    pub avg: (f64, f64),
    /// Range of the averaged reading
    pub avg_range: (i32, i32),
}

fn mean_std(values: &[i32]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let variance = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    (mean, variance.sqrt())
}

/// Summarize a table per distance, in table order
pub fn summarize(table: &CalibrationTable) -> Vec<DistanceSummary> {
    let mut summaries: Vec<DistanceSummary> = Vec::new();
    let mut order: Vec<u32> = Vec::new();
    for row in &table.rows {
        if !order.contains(&row.distance_cm) {
            order.push(row.distance_cm);
        }
    }

    for distance in order {
        let rows: Vec<&CalibrationRow> = table
            .rows
            .iter()
            .filter(|r| r.distance_cm == distance)
            .collect();
        let left: Vec<i32> = rows.iter().map(|r| r.sensor_left).collect();
        let right: Vec<i32> = rows.iter().map(|r| r.sensor_right).collect();
        let avg: Vec<i32> = rows.iter().map(|r| r.sensor_avg).collect();
        summaries.push(DistanceSummary {
            distance_cm: distance,
            count: rows.len(),
            left: mean_std(&left),
            right: mean_std(&right),
            avg: mean_std(&avg),
            avg_range: (
                avg.iter().copied().min().unwrap_or(0),
                avg.iter().copied().max().unwrap_or(0),
            ),
        });
    }
    summaries
}

/// Everything the operator report needs after finalization
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Location of the persisted final table
    pub output_path: PathBuf,
    /// Rows accepted into the table
    pub rows_accepted: usize,
    /// Rows dropped during parsing
    pub rows_dropped: usize,
    /// Distances that completed before the session ended
    pub completed_distances: Vec<u32>,
    /// Per-distance statistics
    pub summaries: Vec<DistanceSummary>,
}

/// Finalizes a session into its persisted table
#[derive(Debug)]
pub struct ResultAggregator {
    output_dir: PathBuf,
}

impl ResultAggregator {
    /// Aggregator writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Final table location for a session
    pub fn final_path(&self, session_id: &str) -> PathBuf {
        self.output_dir.join(format!("calibration_{session_id}.csv"))
    }

    /// Parse, persist, and summarize the session
    ///
    /// Runs exactly once per session, on normal completion, failure, or
    /// cancellation. A failed save here is fatal, unlike an intermediate
    /// checkpoint. The superseded checkpoint is removed once the final file
    /// exists.
    pub fn finalize(
        &self,
        session: &AcquisitionSession,
    ) -> Result<SessionReport, AcquisitionError> {
        let table = CalibrationTable::from_session(session);
        let path = self.final_path(session.session_id());

        std::fs::create_dir_all(&self.output_dir).map_err(|e| AcquisitionError::FinalSave {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_table(&path, &table.rows).map_err(|e| AcquisitionError::FinalSave {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let temp = checkpoint::temp_path(&self.output_dir, session.session_id());
        if temp.exists() {
            if let Err(e) = std::fs::remove_file(&temp) {
                debug!("could not remove checkpoint {}: {e}", temp.display());
            }
        }

        info!(
            "saved {} rows ({} dropped) to {}",
            table.rows.len(),
            table.dropped,
            path.display()
        );

        Ok(SessionReport {
            output_path: path,
            rows_accepted: table.rows.len(),
            rows_dropped: table.dropped,
            completed_distances: session.completed().to_vec(),
            summaries: summarize(&table),
        })
    }
}
