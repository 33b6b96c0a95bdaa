//! Acquisition controller
//!
//! Drives the per-distance protocol state machine over the open channel:
//! configure the distance, wait for the operator-triggered start marker,
//! record rows until the end marker, hand the block to the session. A channel
//! failure or cancellation in any state fails the whole session; the runner
//! then checkpoints and finalizes whatever has accumulated instead of
//! discarding it.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::aggregate::{ResultAggregator, SessionReport};
use super::channel::{CancelToken, Channel, LineReader};
use super::checkpoint::CheckpointWriter;
use super::error::AcquisitionError;
use super::protocol::{classify_line, LineClass, ACK_PREFIX};
use super::session::AcquisitionSession;
use super::state::DistanceState;
use crate::config::AcquisitionConfig;

/// Upper bound on the post-configure acknowledgment drain
///
/// Diagnostics only; the transition to the start wait never depends on it.
const ACK_DRAIN_BOUND: Duration = Duration::from_millis(200);

/// Drives the acquisition state machine for one session
pub struct AcquisitionController<'a> {
    channel: &'a mut dyn Channel,
    reader: LineReader,
    cancel: CancelToken,
    checkpoint_every: usize,
}

impl<'a> AcquisitionController<'a> {
    /// Controller over an open channel
    pub fn new(
        channel: &'a mut dyn Channel,
        config: &AcquisitionConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            channel,
            reader: LineReader::new(),
            cancel,
            checkpoint_every: config.checkpoint_every,
        }
    }

    /// Acquire every configured distance in order
    ///
    /// Checkpoints after every `checkpoint_every` completed distances. Stops
    /// at the first channel failure or cancellation; completed blocks stay in
    /// the session for the finalize path.
    pub fn run(
        &mut self,
        session: &mut AcquisitionSession,
        checkpoints: &CheckpointWriter,
    ) -> Result<(), AcquisitionError> {
        let targets = session.target_distances().to_vec();
        let total = targets.len();

        for (i, distance) in targets.into_iter().enumerate() {
            info!("acquiring distance {distance} cm [{}/{total}]", i + 1);
            let block = self.acquire_distance(distance)?;
            info!("distance {distance} cm complete: {} rows", block.len());
            session.complete_distance(distance, block);

            if (i + 1) % self.checkpoint_every == 0 {
                if let Err(e) = checkpoints.checkpoint(session) {
                    // Best-effort mid-session; only the final save is fatal.
                    warn!("checkpoint failed: {e}");
                }
            }
        }
        Ok(())
    }

    /// Run the per-distance state machine to completion
    fn acquire_distance(&mut self, distance: u32) -> Result<Vec<String>, AcquisitionError> {
        let mut state = DistanceState::Configuring;

        self.configure(distance)?;
        state = self.transition(state, DistanceState::AwaitingStart);

        info!("place the device at {distance} cm and press its start button");
        self.await_start()?;
        state = self.transition(state, DistanceState::Recording);

        let block = self.record()?;
        self.transition(state, DistanceState::Complete);
        Ok(block)
    }

    fn transition(&self, from: DistanceState, to: DistanceState) -> DistanceState {
        debug_assert!(from.can_transition_to(to), "illegal transition {from:?} -> {to:?}");
        debug!("state {from:?} -> {to:?}");
        to
    }

    /// Write the target distance and drain immediate acknowledgments
    fn configure(&mut self, distance: u32) -> Result<(), AcquisitionError> {
        if self.cancel.is_cancelled() {
            return Err(AcquisitionError::Cancelled);
        }
        self.channel.write_all(format!("{distance}\n").as_bytes())?;
        self.channel.flush()?;

        // The device usually answers "[Distance Set To] N"; log whatever it
        // says, but never gate the transition on it.
        let acks = self
            .reader
            .drain_pending(&mut *self.channel, ACK_DRAIN_BOUND)?;
        for line in acks {
            if line.starts_with(ACK_PREFIX) {
                debug!("device acknowledged: {line}");
            } else if !line.is_empty() {
                debug!("device says: {line}");
            }
        }
        Ok(())
    }

    /// Block until the exact start marker arrives
    ///
    /// Indefinite wait: the device begins only on a physical trigger. Every
    /// non-marker line is diagnostic noise and is discarded.
    fn await_start(&mut self) -> Result<(), AcquisitionError> {
        loop {
            let line = self.reader.read_line(&mut *self.channel, &self.cancel)?;
            match classify_line(&line) {
                LineClass::Start => return Ok(()),
                _ => debug!("discarding pre-start line: {line:?}"),
            }
        }
    }

    /// Accept rows until the exact end marker arrives
    fn record(&mut self) -> Result<Vec<String>, AcquisitionError> {
        let mut block = Vec::new();
        loop {
            let line = self.reader.read_line(&mut *self.channel, &self.cancel)?;
            match classify_line(&line) {
                LineClass::End => return Ok(block),
                LineClass::Candidate => block.push(line),
                LineClass::Header => debug!("skipping header line"),
                LineClass::Start | LineClass::Noise => {
                    debug!("discarding in-block line: {line:?}")
                }
            }
        }
    }
}

/// Outcome of a finalized session
#[derive(Debug)]
pub struct SessionOutcome {
    /// The persisted table and its summaries
    pub report: SessionReport,
    /// Why the session ended early, when it did
    pub failure: Option<AcquisitionError>,
}

/// Drive a full session over an open channel and finalize exactly once
///
/// A channel failure or cancellation ends the loop early but still runs the
/// checkpoint-and-save path, so at most the in-flight distance's partial
/// buffer is lost. Only a failed final save is an error here.
pub fn run_session(
    channel: &mut dyn Channel,
    config: &AcquisitionConfig,
    cancel: CancelToken,
) -> Result<SessionOutcome, AcquisitionError> {
    let mut session = AcquisitionSession::new(config);
    run_session_with(channel, config, cancel, &mut session)
}

/// [`run_session`] with a caller-built session; lets tests pin the id
pub fn run_session_with(
    channel: &mut dyn Channel,
    config: &AcquisitionConfig,
    cancel: CancelToken,
    session: &mut AcquisitionSession,
) -> Result<SessionOutcome, AcquisitionError> {
    let checkpoints = CheckpointWriter::new(&config.output_dir);
    let aggregator = ResultAggregator::new(&config.output_dir);

    let mut controller = AcquisitionController::new(channel, config, cancel);
    let failure = match controller.run(session, &checkpoints) {
        Ok(()) => None,
        Err(e) => Some(e),
    };

    // Unconditional end-of-session checkpoint, normal or abnormal.
    if let Err(e) = checkpoints.checkpoint(session) {
        warn!("final checkpoint failed: {e}");
    }

    let report = aggregator.finalize(session)?;
    Ok(SessionOutcome { report, failure })
}
