//! Channel abstraction and line-oriented reading
//!
//! The device speaks newline-delimited ASCII over an exclusively-owned serial
//! link. [`Channel`] is the seam between the real port and the acquisition
//! logic; anything that can read and write bytes qualifies, which is what the
//! protocol tests rely on.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::AcquisitionError;

/// Exclusively-owned byte stream to the device
///
/// Implemented by the opened serial port and by in-memory doubles in tests.
pub trait Channel: Read + Write + Send {}

impl<T: Read + Write + Send> Channel for T {}

/// Cooperative cancellation flag shared with the interrupt handler
///
/// The blocking reads in the acquisition loop observe this token at every
/// read-timeout expiry, so an operator interrupt is noticed without any
/// additional threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Buffered line reader over a [`Channel`]
///
/// Accumulates raw bytes and yields complete lines with the trailing
/// CR/LF stripped. Bytes that are not valid UTF-8 are replaced rather than
/// dropped; the device emits plain ASCII in practice.
#[derive(Debug, Default)]
pub struct LineReader {
    buf: Vec<u8>,
}

impl LineReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the next complete line already sitting in the buffer
    fn pop_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Blocking read of the next line
    ///
    /// Waits indefinitely for device output; every read-timeout expiry on the
    /// underlying channel is used to poll `cancel`, which is the only way out
    /// of the wait besides data or a channel failure.
    pub fn read_line(
        &mut self,
        channel: &mut dyn Channel,
        cancel: &CancelToken,
    ) -> Result<String, AcquisitionError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.pop_line() {
                return Ok(line);
            }
            if cancel.is_cancelled() {
                return Err(AcquisitionError::Cancelled);
            }
            match channel.read(&mut chunk) {
                Ok(0) => {
                    return Err(AcquisitionError::ChannelIo(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "channel closed by device",
                    )))
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if is_timeout(&e) => continue,
                Err(e) => return Err(AcquisitionError::ChannelIo(e)),
            }
        }
    }

    /// Drain lines already buffered or arriving within `bound`
    ///
    /// Non-blocking in spirit: stops at the first read timeout or once the
    /// bound elapses. Used for diagnostic acknowledgment lines that must not
    /// gate a state transition.
    pub fn drain_pending(
        &mut self,
        channel: &mut dyn Channel,
        bound: Duration,
    ) -> Result<Vec<String>, AcquisitionError> {
        let deadline = Instant::now() + bound;
        let mut lines = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            while let Some(line) = self.pop_line() {
                lines.push(line);
            }
            if Instant::now() >= deadline {
                return Ok(lines);
            }
            match channel.read(&mut chunk) {
                Ok(0) => return Ok(lines),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if is_timeout(&e) => return Ok(lines),
                Err(e) => return Err(AcquisitionError::ChannelIo(e)),
            }
        }
    }
}

/// Read-timeout classification for the poll loops
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
