//! Integration tests for the transport session: retry bounds, busy
//! rejection and failure classification against scripted ports.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use umb_rs::umb::checksum::Crc16;
use umb_rs::umb::frame::{encode_frame, FrameError};
use umb_rs::umb::serial_mock::MockSerialPort;
use umb_rs::umb::transport::{TransportError, TransportSession, UmbPort};

/// A port that answers every read with the same scripted bytes and
/// counts how many frames were written to it.
#[derive(Clone)]
struct ScriptedPort {
    response: Vec<u8>,
    writes: Arc<AtomicU32>,
}

impl ScriptedPort {
    fn new(response: Vec<u8>) -> Self {
        ScriptedPort {
            response,
            writes: Arc::new(AtomicU32::new(0)),
        }
    }

    fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl AsyncRead for ScriptedPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let take = self.response.len().min(buf.remaining());
        buf.put_slice(&self.response[..take]);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait::async_trait]
impl UmbPort for ScriptedPort {
    async fn flush_port(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

/// A port on which nothing ever arrives.
#[derive(Clone, Default)]
struct SilentPort;

impl AsyncRead for SilentPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for SilentPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait::async_trait]
impl UmbPort for SilentPort {
    async fn flush_port(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

fn request() -> Vec<u8> {
    encode_frame(0x01, 0x23, &[0x64, 0x00], &Crc16)
}

/// A transport that always returns garbage is attempted exactly
/// `max_retries + 1` times before failing with `Corrupt`.
#[tokio::test]
async fn test_retry_bound_on_garbage() {
    let port = ScriptedPort::new(vec![0xFF; 16]);
    let mut session = TransportSession::new(port.clone(), Arc::new(Crc16));

    let err = session
        .exchange(&request(), 2, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::Corrupt {
            attempts: 3,
            last: FrameError::NoStartMarker,
        }
    );
    assert_eq!(port.write_count(), 3);
}

/// A structurally complete frame with a bad CRC is also retried and
/// classified as corrupt, with the checksum failure preserved.
#[tokio::test]
async fn test_retry_bound_on_checksum_mismatch() {
    let mut bad_frame = encode_frame(0x01, 0x23, &[0x00, 0x64, 0x00], &Crc16);
    bad_frame[5] ^= 0x01; // corrupt the command region
    let port = ScriptedPort::new(bad_frame);
    let mut session = TransportSession::new(port.clone(), Arc::new(Crc16));

    let err = session
        .exchange(&request(), 1, Duration::from_millis(100))
        .await
        .unwrap_err();
    match err {
        TransportError::Corrupt { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(
                last,
                FrameError::ChecksumMismatch { .. } | FrameError::LengthMismatch { .. }
            ));
        }
        other => panic!("expected Corrupt, got {other:?}"),
    }
    assert_eq!(port.write_count(), 2);
    assert_eq!(session.stats().retries, 1);
}

/// A second exchange on the same bus is rejected immediately, without
/// the rejected session touching its port.
#[tokio::test]
async fn test_busy_rejection() {
    let bus_lock = Arc::new(AtomicBool::new(false));
    let mut first = TransportSession::with_bus_lock(
        SilentPort,
        Arc::new(Crc16),
        Arc::clone(&bus_lock),
    );
    let second_port = MockSerialPort::new();
    let mut second =
        TransportSession::with_bus_lock(second_port.clone(), Arc::new(Crc16), bus_lock);

    let in_flight = tokio::spawn(async move {
        let _ = first
            .exchange(&request(), 0, Duration::from_secs(60))
            .await;
    });
    // let the first exchange claim the bus and park in its read
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let err = second
        .exchange(&request(), 0, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Busy);
    assert!(second_port.get_tx_data().is_empty());

    in_flight.abort();
}

/// After an aborted exchange the bus flag is clear again.
#[tokio::test]
async fn test_bus_released_after_cancellation() {
    let bus_lock = Arc::new(AtomicBool::new(false));
    let mut session = TransportSession::with_bus_lock(
        SilentPort,
        Arc::new(Crc16),
        Arc::clone(&bus_lock),
    );

    let in_flight = tokio::spawn(async move {
        let _ = session
            .exchange(&request(), 0, Duration::from_secs(60))
            .await;
    });
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert!(bus_lock.load(Ordering::SeqCst));

    in_flight.abort();
    let _ = in_flight.await;
    assert!(!bus_lock.load(Ordering::SeqCst));
}

/// A silent device exhausts the retry budget as `Unresponsive`.
#[tokio::test(start_paused = true)]
async fn test_silent_device_is_unresponsive() {
    let mut session = TransportSession::new(SilentPort, Arc::new(Crc16));
    let err = session
        .exchange(&request(), 1, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Unresponsive { attempts: 2 });
}

/// A response delivered in several chunks is reassembled into one frame.
#[tokio::test]
async fn test_resynchronization_across_partial_reads() {
    let mock = MockSerialPort::new();
    let response = encode_frame(0x01, 0x23, &[0x00, 0x64, 0x00, 0x16, 0x0A], &Crc16);
    for chunk in response.chunks(2) {
        mock.queue_rx_data(chunk);
    }

    let mut session = TransportSession::new(mock, Arc::new(Crc16));
    let frame = session
        .exchange(&request(), 0, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(frame.payload, vec![0x00, 0x64, 0x00, 0x16, 0x0A]);
}
