//! Error types for the acquisition session
//!
//! One taxonomy covers the whole session lifecycle: port discovery, channel
//! setup, the acquisition loop, and final persistence. Protocol framing noise
//! and malformed data rows are deliberately not represented here; they are
//! discarded or counted where they occur and never abort a session.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised across an acquisition session
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// No serial endpoint is present on the host
    #[error("no serial port found; check that the device is plugged in")]
    NoPortFound,

    /// Several candidate ports and no unique descriptor match
    #[error("cannot choose between serial ports: {}", .candidates.join(", "))]
    PortAmbiguous {
        /// Port names that remain in contention
        candidates: Vec<String>,
    },

    /// The endpoint is held by another process and retries are exhausted
    #[error("serial port {port} is busy after {attempts} attempts")]
    PortAccessDenied {
        /// Port name that could not be acquired
        port: String,
        /// Number of open attempts made
        attempts: u32,
    },

    /// Any other failure while opening the endpoint
    #[error("failed to open serial port {port}: {reason}")]
    Connect {
        /// Port name that failed to open
        port: String,
        /// Underlying open failure
        reason: String,
    },

    /// Read or write failure on the established channel
    #[error("channel I/O error: {0}")]
    ChannelIo(#[from] io::Error),

    /// Operator interrupted a blocking wait
    #[error("acquisition cancelled by operator")]
    Cancelled,

    /// The final table could not be persisted
    #[error("failed to save final table to {}: {reason}", .path.display())]
    FinalSave {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying write failure
        reason: String,
    },

    /// Configuration file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl AcquisitionError {
    /// Check whether this error ends the session through the graceful
    /// finalize-and-persist path rather than an immediate abort
    pub fn finalizes_partial(&self) -> bool {
        matches!(self, Self::ChannelIo(_) | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_errors_finalize_partial() {
        let io_err = AcquisitionError::ChannelIo(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "device unplugged",
        ));
        assert!(io_err.finalizes_partial());
        assert!(AcquisitionError::Cancelled.finalizes_partial());
        assert!(!AcquisitionError::NoPortFound.finalizes_partial());
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = AcquisitionError::PortAmbiguous {
            candidates: vec!["/dev/ttyUSB0".into(), "/dev/ttyUSB1".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("/dev/ttyUSB1"));
    }
}
