//! # UMB Transport Session
//!
//! Reliable exchange of exactly one request/response pair per invocation
//! over a half-duplex RS-485 link. The session is the only component that
//! reads or writes the port, so the at-most-one-frame-in-flight rule is
//! structural: a second exchange on the same bus fails fast with
//! [`TransportError::Busy`] before any byte touches the wire.
//!
//! One attempt is: write the frame, accumulate reads until the codec
//! yields a complete frame or a per-read timeout fires. A decode failure
//! or timeout discards the accumulated buffer and re-sends the original
//! frame from scratch, up to `max_retries` further attempts.

use crate::logging::{log_debug, log_warn};
use crate::umb::checksum::Checksum;
use crate::umb::frame::{decode_frame, FrameError, UmbFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Instant};

/// Trait for serial port operations.
#[async_trait::async_trait]
pub trait UmbPort: AsyncReadExt + AsyncWriteExt + Unpin + Send {
    async fn flush_port(&mut self) -> Result<(), std::io::Error>;
}

#[async_trait::async_trait]
impl UmbPort for tokio_serial::SerialStream {
    async fn flush_port(&mut self) -> Result<(), std::io::Error> {
        AsyncWriteExt::flush(self).await
    }
}

/// Errors surfaced to the query layer after the retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device sent nothing (or stopped mid-frame) on the final attempt.
    #[error("device unresponsive after {attempts} attempts")]
    Unresponsive { attempts: u32 },

    /// The response kept failing to decode.
    #[error("response corrupt after {attempts} attempts: {last}")]
    Corrupt { attempts: u32, last: FrameError },

    /// Another exchange is already in flight on this bus. Not retried:
    /// this is a violation of the single-in-flight contract.
    #[error("bus busy: another exchange is in flight")]
    Busy,

    /// The port itself failed.
    #[error("serial port error: {0}")]
    SerialPortError(String),
}

/// Counters for monitoring one session's traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub retries: u64,
    pub crc_errors: u64,
    pub timeouts: u64,
}

/// Outcome of a single attempt, before retry classification.
enum AttemptError {
    Timeout,
    Decode(FrameError),
    Io(String),
}

/// Owns the port and the one-request-in-flight discipline.
pub struct TransportSession<P: UmbPort> {
    port: P,
    checksum: Arc<dyn Checksum>,
    bus_lock: Arc<AtomicBool>,
    stats: SessionStats,
}

/// Clears the bus flag on every exit path, including cancellation.
struct BusGuard(Arc<AtomicBool>);

impl Drop for BusGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<P: UmbPort> TransportSession<P> {
    /// Creates a session owning its own bus flag.
    pub fn new(port: P, checksum: Arc<dyn Checksum>) -> Self {
        Self::with_bus_lock(port, checksum, Arc::new(AtomicBool::new(false)))
    }

    /// Creates a session sharing a bus flag with other sessions on the
    /// same physical RS-485 segment.
    pub fn with_bus_lock(port: P, checksum: Arc<dyn Checksum>, bus_lock: Arc<AtomicBool>) -> Self {
        TransportSession {
            port,
            checksum,
            bus_lock,
            stats: SessionStats::default(),
        }
    }

    /// The flag guarding this session's bus, for sharing with peers.
    pub fn bus_lock(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.bus_lock)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Sends `frame_bytes` and reads back one validated frame.
    ///
    /// Makes exactly `max_retries + 1` attempts before giving up with
    /// [`TransportError::Unresponsive`] or [`TransportError::Corrupt`],
    /// classified by the failure of the final attempt.
    pub async fn exchange(
        &mut self,
        frame_bytes: &[u8],
        max_retries: u32,
        read_timeout: Duration,
    ) -> Result<UmbFrame, TransportError> {
        self.run_exchange(frame_bytes, max_retries, read_timeout, None)
            .await
    }

    /// Like [`exchange`](Self::exchange), but no attempt starts once
    /// `deadline` has passed and each attempt's timeout is clipped to the
    /// time still left. A retry budget never stretches past the deadline.
    pub async fn exchange_until(
        &mut self,
        frame_bytes: &[u8],
        max_retries: u32,
        read_timeout: Duration,
        deadline: Instant,
    ) -> Result<UmbFrame, TransportError> {
        self.run_exchange(frame_bytes, max_retries, read_timeout, Some(deadline))
            .await
    }

    async fn run_exchange(
        &mut self,
        frame_bytes: &[u8],
        max_retries: u32,
        read_timeout: Duration,
        deadline: Option<Instant>,
    ) -> Result<UmbFrame, TransportError> {
        if self.bus_lock.swap(true, Ordering::SeqCst) {
            return Err(TransportError::Busy);
        }
        let _guard = BusGuard(Arc::clone(&self.bus_lock));

        let max_attempts = max_retries + 1;
        let mut attempts = 0;
        let mut last_failure: Option<AttemptError> = None;

        while attempts < max_attempts {
            let attempt_timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    read_timeout.min(remaining)
                }
                None => read_timeout,
            };

            if attempts > 0 {
                self.stats.retries += 1;
                log_debug(&format!(
                    "retrying exchange, attempt {}/{max_attempts}",
                    attempts + 1
                ));
            }

            self.port
                .write_all(frame_bytes)
                .await
                .map_err(|e| TransportError::SerialPortError(e.to_string()))?;
            self.port
                .flush_port()
                .await
                .map_err(|e| TransportError::SerialPortError(e.to_string()))?;
            self.stats.frames_sent += 1;
            attempts += 1;
            log_debug(&format!("tx frame: {}", hex::encode(frame_bytes)));

            match self.read_frame(attempt_timeout).await {
                Ok(frame) => {
                    self.stats.frames_received += 1;
                    return Ok(frame);
                }
                Err(AttemptError::Timeout) => {
                    self.stats.timeouts += 1;
                    last_failure = Some(AttemptError::Timeout);
                }
                Err(AttemptError::Decode(e)) => {
                    if matches!(e, FrameError::ChecksumMismatch { .. }) {
                        self.stats.crc_errors += 1;
                    }
                    log_warn(&format!("rx frame rejected: {e}"));
                    last_failure = Some(AttemptError::Decode(e));
                }
                Err(AttemptError::Io(e)) => {
                    return Err(TransportError::SerialPortError(e));
                }
            }
        }

        match last_failure {
            Some(AttemptError::Decode(e)) => Err(TransportError::Corrupt {
                attempts,
                last: e,
            }),
            _ => Err(TransportError::Unresponsive { attempts }),
        }
    }

    /// Accumulates reads until the codec stops asking for more bytes.
    async fn read_frame(&mut self, read_timeout: Duration) -> Result<UmbFrame, AttemptError> {
        let mut buf: Vec<u8> = Vec::with_capacity(64);
        let mut chunk = [0u8; 64];

        loop {
            let n = match timeout(read_timeout, self.port.read(&mut chunk)).await {
                Err(_) => return Err(AttemptError::Timeout),
                Ok(Ok(0)) => return Err(AttemptError::Timeout),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(AttemptError::Io(e.to_string())),
            };
            buf.extend_from_slice(&chunk[..n]);

            match decode_frame(&buf, self.checksum.as_ref()) {
                Ok(frame) => {
                    log_debug(&format!("rx frame: {}", hex::encode(&buf)));
                    return Ok(frame);
                }
                // Structurally incomplete; keep reading.
                Err(FrameError::Truncated) => continue,
                Err(e) => return Err(AttemptError::Decode(e)),
            }
        }
    }
}
