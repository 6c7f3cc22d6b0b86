//! Mock serial port for testing the UMB transport without hardware.
//!
//! Reads preserve the chunk boundaries they were queued with, which models
//! the inter-message timing of a real half-duplex link: one queued chunk
//! per scripted device transmission, split chunks for partial reads. An
//! empty queue leaves the reader pending, so per-read timeouts drive the
//! unresponsive paths exactly as on a silent bus.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock serial port that simulates bidirectional communication.
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Chunks to be read from the port (incoming)
    rx_chunks: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Simulated error for the next operation
    next_error: Arc<Mutex<Option<io::Error>>>,
    /// Reader parked on an empty queue
    read_waker: Arc<Mutex<Option<Waker>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk of data to be returned by a single read.
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.rx_chunks
            .lock()
            .unwrap()
            .push_back(data.to_vec());
        if let Some(waker) = self.read_waker.lock().unwrap().take() {
            waker.wake();
        }
    }

    /// Get data that was written to the port.
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Clear all buffers.
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_chunks.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next read or write.
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

#[async_trait::async_trait]
impl crate::umb::transport::UmbPort for MockSerialPort {
    async fn flush_port(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut chunks = self.rx_chunks.lock().unwrap();
        match chunks.front_mut() {
            Some(chunk) => {
                let take = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..take]);
                if take == chunk.len() {
                    chunks.pop_front();
                } else {
                    chunk.drain(..take);
                }
                Poll::Ready(Ok(()))
            }
            None => {
                // Nothing scripted: behave like a silent bus.
                *self.read_waker.lock().unwrap() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        self.tx_buffer.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
