//! Acquisition session settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::AcquisitionError;

/// Default distance schedule in centimeters
pub const DEFAULT_DISTANCES: &[u32] = &[3, 5, 7, 10, 12, 15, 20, 25, 30, 35, 40];

/// Immutable configuration for one acquisition session
///
/// All fields have working defaults; a TOML file or CLI flags may override
/// them before the session is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Distances to acquire, in centimeters, in acquisition order
    pub target_distances: Vec<u32>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Read timeout on the serial channel in milliseconds
    ///
    /// Also the cancellation poll interval for the blocking waits.
    pub io_timeout_ms: u64,
    /// Checkpoint after this many completed distances
    pub checkpoint_every: usize,
    /// Settle interval after opening the port, in milliseconds
    ///
    /// Accommodates device reset-on-connect before the buffers are cleared.
    pub settle_ms: u64,
    /// Maximum port-open attempts when the endpoint is busy
    pub connect_attempts: u32,
    /// Pause between port-open attempts in milliseconds
    pub retry_pause_ms: u64,
    /// Directory receiving checkpoint and final table files
    pub output_dir: PathBuf,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            target_distances: DEFAULT_DISTANCES.to_vec(),
            baud_rate: 115_200,
            io_timeout_ms: 2000,
            checkpoint_every: 3,
            settle_ms: 2000,
            connect_attempts: 3,
            retry_pause_ms: 1000,
            output_dir: PathBuf::from("calibration_data"),
        }
    }
}

impl AcquisitionConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, AcquisitionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AcquisitionError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AcquisitionError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints that serde cannot express
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.target_distances.is_empty() {
            return Err(AcquisitionError::Config(
                "target_distances must not be empty".into(),
            ));
        }
        if self.target_distances.contains(&0) {
            return Err(AcquisitionError::Config(
                "target_distances must be positive".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for d in &self.target_distances {
            if !seen.insert(d) {
                return Err(AcquisitionError::Config(format!(
                    "duplicate target distance: {d}"
                )));
            }
        }
        if self.checkpoint_every == 0 {
            return Err(AcquisitionError::Config(
                "checkpoint_every must be at least 1".into(),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(AcquisitionError::Config(
                "connect_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Set the distance schedule
    #[must_use]
    pub fn target_distances(mut self, distances: Vec<u32>) -> Self {
        self.target_distances = distances;
        self
    }

    /// Set the baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Read timeout as a [`Duration`]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Settle interval as a [`Duration`]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Retry pause as a [`Duration`]
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

/// Parse an operator-supplied comma-separated distance list
///
/// Example input: `3,5,10,15,20`.
pub fn parse_distance_list(input: &str) -> Result<Vec<u32>, AcquisitionError> {
    let distances: Result<Vec<u32>, _> = input
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect();
    let distances =
        distances.map_err(|e| AcquisitionError::Config(format!("invalid distance list: {e}")))?;
    let config = AcquisitionConfig::default().target_distances(distances.clone());
    config.validate()?;
    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AcquisitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_distances, DEFAULT_DISTANCES);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.checkpoint_every, 3);
    }

    #[test]
    fn test_rejects_empty_zero_and_duplicate_distances() {
        let empty = AcquisitionConfig::default().target_distances(vec![]);
        assert!(empty.validate().is_err());

        let zero = AcquisitionConfig::default().target_distances(vec![5, 0]);
        assert!(zero.validate().is_err());

        let dup = AcquisitionConfig::default().target_distances(vec![5, 10, 5]);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_parse_distance_list() {
        assert_eq!(parse_distance_list("3,5,10").unwrap(), vec![3, 5, 10]);
        assert_eq!(parse_distance_list(" 3, 5 ,10 ").unwrap(), vec![3, 5, 10]);
        assert!(parse_distance_list("3,five,10").is_err());
        assert!(parse_distance_list("").is_err());
    }

    #[test]
    fn test_toml_overrides_partial_fields() {
        let parsed: AcquisitionConfig =
            toml::from_str("baud_rate = 9600\ntarget_distances = [5, 10]").unwrap();
        assert_eq!(parsed.baud_rate, 9600);
        assert_eq!(parsed.target_distances, vec![5, 10]);
        // Untouched fields keep their defaults.
        assert_eq!(parsed.checkpoint_every, 3);
    }
}
