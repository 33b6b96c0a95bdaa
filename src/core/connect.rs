//! Session channel setup
//!
//! Opens the exclusive serial channel for a session: open, settle while the
//! device resets, then clear stale buffered bytes so leftovers from a prior
//! session cannot corrupt the first state transition. The busy/access-denied
//! failure class is retried under a bounded policy; everything else is fatal
//! immediately.

use std::thread;
use std::time::Duration;

use serialport::ClearBuffer;
use tracing::{info, warn};

use super::channel::Channel;
use super::error::AcquisitionError;
use crate::config::AcquisitionConfig;

/// Bounded retry policy for the busy/access-denied open failure class
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum open attempts
    pub max_attempts: u32,
    /// Pause between attempts
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pause: Duration::from_secs(1),
        }
    }
}

/// Operator guidance logged while the endpoint is held elsewhere
pub const BUSY_REMEDIATION: &[&str] = &[
    "close any serial monitor holding the port (IDE, PuTTY, CoolTerm)",
    "unplug and replug the device's USB cable",
    "check this account's permission to open serial ports",
];

/// Classified failure from one open attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenFailure {
    /// Endpoint exclusively held elsewhere; worth retrying
    Busy(String),
    /// Anything else; not retried
    Fatal(String),
}

/// Run `open` under the retry policy
///
/// Only [`OpenFailure::Busy`] consumes attempts; a fatal failure propagates
/// at once. Decoupled from the serial layer so the policy is testable
/// without hardware.
pub fn open_with_retry<T>(
    policy: &RetryPolicy,
    port: &str,
    mut open: impl FnMut(u32) -> Result<T, OpenFailure>,
) -> Result<T, AcquisitionError> {
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            info!("retrying {port} (attempt {attempt}/{})", policy.max_attempts);
        }
        match open(attempt) {
            Ok(channel) => return Ok(channel),
            Err(OpenFailure::Busy(reason)) => {
                warn!("{port} is busy: {reason}");
                for hint in BUSY_REMEDIATION {
                    warn!("  - {hint}");
                }
                if attempt < policy.max_attempts {
                    thread::sleep(policy.pause);
                }
            }
            Err(OpenFailure::Fatal(reason)) => {
                return Err(AcquisitionError::Connect {
                    port: port.to_string(),
                    reason,
                })
            }
        }
    }
    Err(AcquisitionError::PortAccessDenied {
        port: port.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Classify a serial open error into the retry taxonomy
fn classify_open_error(e: &serialport::Error) -> OpenFailure {
    let text = e.to_string();
    let busy = matches!(
        e.kind(),
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied)
    ) || text.contains("busy")
        || text.contains("denied")
        || text.contains("in use");
    if busy {
        OpenFailure::Busy(text)
    } else {
        OpenFailure::Fatal(text)
    }
}

/// Opens and prepares the session's exclusive channel
#[derive(Debug)]
pub struct SessionConnector {
    baud_rate: u32,
    io_timeout: Duration,
    settle: Duration,
    policy: RetryPolicy,
}

impl SessionConnector {
    /// Build a connector from the session configuration
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            io_timeout: config.io_timeout(),
            settle: config.settle(),
            policy: RetryPolicy {
                max_attempts: config.connect_attempts,
                pause: config.retry_pause(),
            },
        }
    }

    /// Open the channel to `port`
    ///
    /// The returned channel is exclusively owned; dropping it releases the
    /// endpoint on every exit path.
    pub fn connect(&self, port: &str) -> Result<Box<dyn Channel>, AcquisitionError> {
        let serial = open_with_retry(&self.policy, port, |_attempt| {
            serialport::new(port, self.baud_rate)
                .timeout(self.io_timeout)
                .open()
                .map_err(|e| classify_open_error(&e))
        })?;

        // Device resets on connect; give it time before touching the line.
        thread::sleep(self.settle);
        serial
            .clear(ClearBuffer::All)
            .map_err(|e| AcquisitionError::ChannelIo(e.into()))?;

        info!("connected to {port} at {} baud", self.baud_rate);
        Ok(Box::new(serial))
    }
}
