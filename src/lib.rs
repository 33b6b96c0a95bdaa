//! # Bumpcal Core Library
//!
//! Automated calibration data acquisition for a serial-attached bump-sensor
//! device:
//! - Port discovery with heuristic device selection
//! - Exclusive channel setup with bounded busy-retry
//! - A per-distance acquisition state machine over a line-oriented protocol
//! - Checkpointing of partial results against data loss
//! - Final CSV table persistence and per-distance summaries
//!
//! ## Example
//!
//! ```rust,no_run
//! use bumpcal_core::{AcquisitionConfig, CancelToken, PortChoice, PortLocator, SessionConnector};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AcquisitionConfig::default().target_distances(vec![5, 10, 15]);
//!
//!     let port = match PortLocator.locate()? {
//!         PortChoice::Definite(candidate) => candidate.name,
//!         PortChoice::Ambiguous(_) => anyhow::bail!("several ports found"),
//!     };
//!
//!     let mut channel = SessionConnector::new(&config).connect(&port)?;
//!     let outcome = bumpcal_core::run_session(channel.as_mut(), &config, CancelToken::new())?;
//!     println!("{} rows saved", outcome.report.rows_accepted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::config::{parse_distance_list, AcquisitionConfig, DEFAULT_DISTANCES};
pub use crate::core::{
    classify_line, parse_row, run_session, run_session_with, AcquisitionController,
    AcquisitionError, AcquisitionSession, CalibrationRow, CalibrationTable, CancelToken, Channel,
    CheckpointWriter, DistanceState, DistanceSummary, LineClass, LineReader, PortCandidate,
    PortChoice, PortLocator, ResultAggregator, RetryPolicy, SessionConnector, SessionOutcome,
    SessionReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
