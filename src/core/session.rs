//! Acquisition session state
//!
//! One session spans all configured distances, bounded by channel open and
//! close. The session value is mutated only by the controller (appending a
//! completed distance's row block) and snapshotted by the checkpoint writer;
//! finalization happens exactly once, whether the run completes, fails, or
//! is cancelled.

use chrono::Local;

use crate::config::AcquisitionConfig;

/// State accumulated across one acquisition run
#[derive(Debug, Clone)]
pub struct AcquisitionSession {
    session_id: String,
    target_distances: Vec<u32>,
    completed: Vec<u32>,
    rows: Vec<String>,
}

impl AcquisitionSession {
    /// Create a session for the configured distance schedule
    ///
    /// The session id is a local-time token used to name every artifact the
    /// session persists.
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self::with_id(
            config,
            Local::now().format("%Y%m%d_%H%M%S").to_string(),
        )
    }

    /// Create a session with an explicit id
    pub fn with_id(config: &AcquisitionConfig, session_id: String) -> Self {
        Self {
            session_id,
            target_distances: config.target_distances.clone(),
            completed: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Timestamp token identifying this session
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Configured distance schedule
    pub fn target_distances(&self) -> &[u32] {
        &self.target_distances
    }

    /// Distances whose blocks have been recorded, in completion order
    pub fn completed(&self) -> &[u32] {
        &self.completed
    }

    /// Raw data rows accumulated so far, arrival order preserved
    pub fn raw_rows(&self) -> &[String] {
        &self.rows
    }

    /// Append a completed distance's row block and mark it done
    pub fn complete_distance(&mut self, distance: u32, block: Vec<String>) {
        self.rows.extend(block);
        self.completed.push(distance);
    }

    /// Check whether every configured distance has completed
    pub fn is_finished(&self) -> bool {
        self.completed.len() == self.target_distances.len()
    }
}
