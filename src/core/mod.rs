//! Core module containing the acquisition engine
//!
//! This module provides:
//! - Port discovery and heuristic device selection
//! - Session channel setup with bounded busy-retry
//! - Line-oriented wire protocol (markers, header, data rows)
//! - The per-distance acquisition state machine
//! - Checkpointing of partial results
//! - Final table aggregation, persistence, and summaries

pub mod aggregate;
pub mod channel;
pub mod checkpoint;
pub mod connect;
pub mod controller;
pub mod error;
pub mod port;
pub mod protocol;
pub mod session;
pub mod state;

pub use aggregate::{summarize, CalibrationTable, DistanceSummary, ResultAggregator, SessionReport};
pub use channel::{CancelToken, Channel, LineReader};
pub use checkpoint::CheckpointWriter;
pub use connect::{open_with_retry, OpenFailure, RetryPolicy, SessionConnector};
pub use controller::{run_session, run_session_with, AcquisitionController, SessionOutcome};
pub use error::AcquisitionError;
pub use port::{classify, PortCandidate, PortChoice, PortLocator};
pub use protocol::{classify_line, parse_row, CalibrationRow, LineClass, RowParseError};
pub use session::AcquisitionSession;
pub use state::DistanceState;
