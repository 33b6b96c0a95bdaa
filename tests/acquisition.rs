//! End-to-end acquisition scenarios over a scripted channel
//!
//! The device is replaced by a scripted byte stream that models the timing of
//! a real serial link: data arrives in bursts separated by read timeouts, and
//! failures appear as I/O errors mid-script.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use bumpcal_core::{
    run_session_with, AcquisitionConfig, AcquisitionError, AcquisitionSession, CancelToken,
};

/// One scripted read result
enum Step {
    /// Bytes the device sends
    Data(Vec<u8>),
    /// A read-timeout window (no data pending)
    Timeout,
    /// Cancel the session token, then time out
    Cancel(CancelToken),
    /// A hard channel failure
    Fail(io::ErrorKind),
}

/// In-memory channel driven by a step script
struct ScriptedChannel {
    steps: VecDeque<Step>,
    written: Vec<u8>,
}

impl ScriptedChannel {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            written: Vec::new(),
        }
    }

    fn sent(&self) -> String {
        String::from_utf8_lossy(&self.written).to_string()
    }
}

impl Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes[n..].to_vec()));
                }
                Ok(n)
            }
            Some(Step::Timeout) => Err(io::ErrorKind::TimedOut.into()),
            Some(Step::Cancel(token)) => {
                token.cancel();
                Err(io::ErrorKind::TimedOut.into())
            }
            Some(Step::Fail(kind)) => Err(kind.into()),
            None => Ok(0),
        }
    }
}

impl Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn data(text: &str) -> Step {
    Step::Data(text.as_bytes().to_vec())
}

fn config_for(dir: &std::path::Path, distances: &[u32]) -> AcquisitionConfig {
    AcquisitionConfig::default()
        .target_distances(distances.to_vec())
        .output_dir(dir)
}

fn pinned_session(config: &AcquisitionConfig) -> AcquisitionSession {
    AcquisitionSession::with_id(config, "20260807_153000".to_string())
}

/// Transcript for one distance: ack, start, header, rows, end
fn block(distance: u32, rows: &[&str]) -> Vec<Step> {
    let mut steps = vec![
        data(&format!("[Distance Set To] {distance}\n")),
        Step::Timeout,
        data("DATA RECORD START\n"),
        data("distance_cm,sample_id,sensor_left,sensor_right,sensor_avg\n"),
    ];
    for row in rows {
        steps.push(data(&format!("{row}\n")));
    }
    steps.push(data("DATA RECORD END\n"));
    steps
}

#[test]
fn two_distance_session_collects_all_rows_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5, 10]);
    let mut session = pinned_session(&config);

    let mut steps = block(5, &["5,0,400,410,405", "5,1,402,408,405"]);
    steps.extend(block(10, &["10,0,300,310,305", "10,1,302,308,305"]));
    let mut channel = ScriptedChannel::new(steps);

    let outcome =
        run_session_with(&mut channel, &config, CancelToken::new(), &mut session).unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.rows_accepted, 4);
    assert_eq!(outcome.report.rows_dropped, 0);
    assert_eq!(outcome.report.completed_distances, vec![5, 10]);
    assert_eq!(channel.sent(), "5\n10\n");

    let table = std::fs::read_to_string(&outcome.report.output_path).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(
        lines,
        vec![
            "distance_cm,sample_id,sensor_left,sensor_right,sensor_avg",
            "5,0,400,410,405",
            "5,1,402,408,405",
            "10,0,300,310,305",
            "10,1,302,308,305",
        ]
    );
}

#[test]
fn stray_diagnostics_and_partial_markers_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5]);
    let mut session = pinned_session(&config);

    let steps = vec![
        Step::Timeout,
        // Noise before the block, including a marker with trailing content.
        data("booting...\n"),
        data("DATA RECORD START extra\n"),
        data("DATA RECORD START\n"),
        data("distance_cm,sample_id,sensor_left,sensor_right,sensor_avg\n"),
        data("5,0,400,410,405\n"),
        data("button bounce detected\n"),
        data("5,1,402,408,405\n"),
        data("DATA RECORD END\n"),
    ];
    let mut channel = ScriptedChannel::new(steps);

    let outcome =
        run_session_with(&mut channel, &config, CancelToken::new(), &mut session).unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.rows_accepted, 2);
    assert_eq!(outcome.report.rows_dropped, 0);

    let table = std::fs::read_to_string(&outcome.report.output_path).unwrap();
    assert!(!table.contains("button bounce"));
    assert!(!table.contains("extra"));
}

#[test]
fn malformed_rows_are_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5]);
    let mut session = pinned_session(&config);

    let mut channel = ScriptedChannel::new(block(
        5,
        &["5,0,400,410,405", "5,1,402,408", "5,2,404,406,405"],
    ));

    let outcome =
        run_session_with(&mut channel, &config, CancelToken::new(), &mut session).unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.rows_accepted, 2);
    assert_eq!(outcome.report.rows_dropped, 1);
    assert_eq!(outcome.report.completed_distances, vec![5]);
}

#[test]
fn channel_failure_saves_completed_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5, 10]);
    let mut session = pinned_session(&config);

    let mut steps = block(5, &["5,0,400,410,405", "5,1,402,408,405"]);
    // Device drops off the bus while the second distance waits for its start.
    steps.push(Step::Timeout);
    steps.push(Step::Fail(io::ErrorKind::BrokenPipe));
    let mut channel = ScriptedChannel::new(steps);

    let outcome =
        run_session_with(&mut channel, &config, CancelToken::new(), &mut session).unwrap();

    assert!(matches!(
        outcome.failure,
        Some(AcquisitionError::ChannelIo(_))
    ));
    assert_eq!(outcome.report.rows_accepted, 2);
    assert_eq!(outcome.report.completed_distances, vec![5]);

    let table = std::fs::read_to_string(&outcome.report.output_path).unwrap();
    let distances: Vec<&str> = table
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(distances, vec!["5", "5"]);

    // The superseded checkpoint is gone once the final table exists.
    assert!(!dir
        .path()
        .join("calibration_temp_20260807_153000.csv")
        .exists());
}

#[test]
fn cancellation_finalizes_accumulated_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5, 10]);
    let mut session = pinned_session(&config);
    let cancel = CancelToken::new();

    let mut steps = block(5, &["5,0,400,410,405"]);
    // Operator interrupts while the second distance waits for its trigger.
    steps.push(Step::Timeout);
    steps.push(Step::Cancel(cancel.clone()));
    let mut channel = ScriptedChannel::new(steps);

    let outcome = run_session_with(&mut channel, &config, cancel, &mut session).unwrap();

    assert!(matches!(outcome.failure, Some(AcquisitionError::Cancelled)));
    assert_eq!(outcome.report.rows_accepted, 1);
    assert_eq!(outcome.report.completed_distances, vec![5]);
    assert!(outcome.report.output_path.exists());
}

#[test]
fn busy_port_retries_then_session_runs_clean() {
    use bumpcal_core::core::{open_with_retry, OpenFailure, RetryPolicy};

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &[5, 10]);
    let mut session = pinned_session(&config);

    let policy = RetryPolicy {
        max_attempts: 3,
        pause: std::time::Duration::ZERO,
    };
    let mut attempts = 0;
    let mut channel = open_with_retry(&policy, "/dev/ttyUSB0", |attempt| {
        attempts = attempt;
        if attempt < 3 {
            Err(OpenFailure::Busy("resource busy".into()))
        } else {
            let mut steps = block(5, &["5,0,400,410,405", "5,1,402,408,405"]);
            steps.extend(block(10, &["10,0,300,310,305", "10,1,302,308,305"]));
            Ok(ScriptedChannel::new(steps))
        }
    })
    .unwrap();
    assert_eq!(attempts, 3);

    let outcome =
        run_session_with(&mut channel, &config, CancelToken::new(), &mut session).unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.rows_accepted, 4);
    assert_eq!(outcome.report.completed_distances, vec![5, 10]);
    // Exactly one configure write per distance despite the retried connects.
    assert_eq!(channel.sent(), "5\n10\n");
}
