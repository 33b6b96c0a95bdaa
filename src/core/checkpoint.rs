//! Durable partial-result checkpoints
//!
//! Best-effort snapshots of the rows collected so far, written between
//! distances so a failed or interrupted session loses at most the in-flight
//! block. Each snapshot overwrites the previous one for the same session and
//! is tagged as temporary; the aggregator removes it once the final table
//! exists.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::aggregate::{write_table, CalibrationTable};
use super::session::AcquisitionSession;

/// Checkpoint location for a session inside `dir`
pub fn temp_path(dir: &Path, session_id: &str) -> PathBuf {
    dir.join(format!("calibration_temp_{session_id}.csv"))
}

/// Writes overwrite-in-place checkpoint snapshots
#[derive(Debug)]
pub struct CheckpointWriter {
    output_dir: PathBuf,
}

impl CheckpointWriter {
    /// Writer targeting `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Checkpoint location for `session_id`
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        temp_path(&self.output_dir, session_id)
    }

    /// Snapshot the session's rows collected so far
    ///
    /// Goes through the same parse/write path as finalization, so the file is
    /// always a strict prefix of the eventual final table. Callers decide
    /// whether a failure matters: mid-session it is logged and ignored, at
    /// session end it becomes the final-save error.
    pub fn checkpoint(&self, session: &AcquisitionSession) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(session.session_id());
        let table = CalibrationTable::from_session(session);
        write_table(&path, &table.rows).map_err(io::Error::other)?;
        debug!(
            "checkpointed {} rows to {}",
            table.rows.len(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcquisitionConfig;

    fn session(targets: &[u32]) -> AcquisitionSession {
        let config = AcquisitionConfig::default().target_distances(targets.to_vec());
        AcquisitionSession::with_id(&config, "20260807_120000".to_string())
    }

    #[test]
    fn test_checkpoint_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path());
        let mut s = session(&[5, 10]);

        s.complete_distance(5, vec!["5,0,400,410,405".into()]);
        let path = writer.checkpoint(&s).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first.lines().count(), 2);

        s.complete_distance(10, vec!["10,0,300,310,305".into()]);
        writer.checkpoint(&s).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(second.lines().count(), 3);
        assert!(second.starts_with(&first));
    }

    #[test]
    fn test_checkpoint_is_prefix_of_final_table() {
        use super::super::aggregate::ResultAggregator;

        let dir = tempfile::tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path());
        let mut s = session(&[5, 10]);

        s.complete_distance(5, vec!["5,0,400,410,405".into(), "5,1,402,408,405".into()]);
        let checkpoint_path = writer.checkpoint(&s).unwrap();
        let snapshot = std::fs::read_to_string(&checkpoint_path).unwrap();

        s.complete_distance(10, vec!["10,0,300,310,305".into()]);
        let report = ResultAggregator::new(dir.path()).finalize(&s).unwrap();
        let final_table = std::fs::read_to_string(&report.output_path).unwrap();

        assert!(final_table.starts_with(&snapshot));
        assert!(final_table.len() > snapshot.len());
    }
}
