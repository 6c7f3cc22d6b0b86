//! # umb-rs - A Rust Crate for Lufft UMB Protocol Communication
//!
//! The umb-rs crate provides a Rust-based implementation of the Lufft UMB
//! (Universal Messtechnik Bus) protocol, used to query weather-station
//! sensors such as temperature, wind and precipitation gauges over an
//! RS-485/serial link.
//!
//! ## Features
//!
//! - Connect to UMB devices using a serial port connection
//! - Query sensor channels one at a time, channel by channel, or packed
//!   into a single combined request
//! - Frame encoding/decoding with byte-stuffing and CRC validation
//! - Bounded retry with resynchronization over the half-duplex transport
//! - Typed channel values plus the device status code per channel
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use umb_rs::{connect, UmbError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), UmbError> {
//!     let mut handle = connect("/dev/ttyUSB0").await?;
//!     let result = handle.query_single(100).await?;
//!     println!("{:?} ({})", result.value, result.status);
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod payload;
pub mod umb;

pub use crate::error::UmbError;
pub use crate::logging::{init_logger, log_info};

// Core UMB types
pub use payload::{ChannelResult, ChannelValue};
pub use umb::serial::{SerialConfig, UmbDeviceHandle};
pub use umb::{describe_status, ClientConfig, StatusCode, UmbClient, UmbFrame};

use std::time::Duration;

/// Connect to a UMB device via serial port.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
///
/// # Returns
/// * `Ok(UmbDeviceHandle)` - Connected device handle for communication
/// * `Err(UmbError)` - Connection failed
pub async fn connect(port: &str) -> Result<UmbDeviceHandle, UmbError> {
    UmbDeviceHandle::connect(port).await
}

/// Disconnect from a UMB device.
pub async fn disconnect(handle: UmbDeviceHandle) -> Result<(), UmbError> {
    handle.disconnect().await
}

/// Request one value from one channel.
///
/// # Arguments
/// * `handle` - Device handle to communicate through
/// * `channel` - Channel number addressing one sensor measurement
///
/// # Returns
/// * `Ok(ChannelResult)` - Decoded value and device status
/// * `Err(UmbError)` - The exchange failed
pub async fn query_single(
    handle: &mut UmbDeviceHandle,
    channel: u16,
) -> Result<ChannelResult, UmbError> {
    handle.query_single(channel).await
}

/// Request values from multiple channels, one exchange per channel.
///
/// Results preserve the order of `channels`; a failed exchange is
/// recorded in that channel's status without aborting the rest.
pub async fn query_multi(
    handle: &mut UmbDeviceHandle,
    channels: &[u16],
) -> Result<Vec<ChannelResult>, UmbError> {
    handle.query_multi(channels).await
}

/// Request values from multiple channels under an overall deadline.
pub async fn query_multi_with_deadline(
    handle: &mut UmbDeviceHandle,
    channels: &[u16],
    overall: Duration,
) -> Result<Vec<ChannelResult>, UmbError> {
    handle.query_multi_with_deadline(channels, overall).await
}

/// Request values from multiple channels in one call.
pub async fn query_multi_combined(
    handle: &mut UmbDeviceHandle,
    channels: &[u16],
) -> Result<Vec<ChannelResult>, UmbError> {
    handle.query_multi_combined(channels).await
}
