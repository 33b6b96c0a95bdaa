//! Device wire protocol
//!
//! Newline-delimited ASCII. The host sends one decimal integer line (the
//! target distance); the device answers with a stream of lines in which two
//! literal markers delimit a data block, a literal header line is recognized
//! and skipped, and everything else inside the block is a candidate data row
//! of comma-separated decimal fields.
//!
//! Markers match on the exact line only, after CR/LF trimming: a line that
//! merely contains the marker text does not delimit a block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Start-of-block marker emitted by the device
pub const START_MARKER: &str = "DATA RECORD START";

/// End-of-block marker emitted by the device
pub const END_MARKER: &str = "DATA RECORD END";

/// Column header line the device prints before its rows
pub const HEADER_LINE: &str = "distance_cm,sample_id,sensor_left,sensor_right,sensor_avg";

/// Acknowledgment prefix the device may print after a distance is set
pub const ACK_PREFIX: &str = "[Distance Set To]";

/// Field separator within a data row
pub const FIELD_SEPARATOR: char = ',';

/// One structured calibration sample
///
/// Ties a configured distance to the two sensor readings taken concurrently
/// and their device-computed average. `sample_id` is assigned by the device
/// and reflects arrival order within the distance's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRow {
    /// Configured distance in centimeters
    pub distance_cm: u32,
    /// Device-assigned sample index within the block
    pub sample_id: u32,
    /// Left sensor reading
    pub sensor_left: i32,
    /// Right sensor reading
    pub sensor_right: i32,
    /// Device-computed average of both sensors
    pub sensor_avg: i32,
}

/// Classification of one received line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Exact start-of-block marker
    Start,
    /// Exact end-of-block marker
    End,
    /// Exact column header line
    Header,
    /// Shape of a data row: non-empty, contains the field separator
    Candidate,
    /// Anything else; discarded as diagnostic noise
    Noise,
}

/// Classify a received line against the protocol literals
pub fn classify_line(line: &str) -> LineClass {
    if line == START_MARKER {
        LineClass::Start
    } else if line == END_MARKER {
        LineClass::End
    } else if line == HEADER_LINE {
        LineClass::Header
    } else if !line.is_empty() && line.contains(FIELD_SEPARATOR) {
        LineClass::Candidate
    } else {
        LineClass::Noise
    }
}

/// Failure to parse a buffered candidate row into a [`CalibrationRow`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowParseError {
    /// Wrong number of comma-separated fields
    #[error("expected 5 fields, found {found}")]
    FieldCount {
        /// Number of fields present in the row
        found: usize,
    },

    /// A field did not parse as a decimal integer
    #[error("field {name} is not a decimal integer: {value:?}")]
    Field {
        /// Schema name of the offending field
        name: &'static str,
        /// Raw field text
        value: String,
    },
}

/// Parse one raw data row
///
/// The schema is exactly five decimal fields:
/// `distance_cm,sample_id,sensor_left,sensor_right,sensor_avg`.
pub fn parse_row(line: &str) -> Result<CalibrationRow, RowParseError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != 5 {
        return Err(RowParseError::FieldCount {
            found: fields.len(),
        });
    }

    fn field<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, RowParseError> {
        raw.trim().parse().map_err(|_| RowParseError::Field {
            name,
            value: raw.to_string(),
        })
    }

    Ok(CalibrationRow {
        distance_cm: field("distance_cm", fields[0])?,
        sample_id: field("sample_id", fields[1])?,
        sensor_left: field("sensor_left", fields[2])?,
        sensor_right: field("sensor_right", fields[3])?,
        sensor_avg: field("sensor_avg", fields[4])?,
    })
}
