//! # UMB Error Handling
//!
//! This module defines the UmbError enum, the crate-level umbrella over the
//! codec and transport error types.

use thiserror::Error;

use crate::umb::frame::FrameError;
use crate::umb::transport::TransportError;

/// Represents the different error types that can occur in the UMB crate.
#[derive(Debug, Error)]
pub enum UmbError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates an error while encoding or decoding a UMB frame.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Indicates a failed request/response exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Indicates a channel number outside the queryable range.
    #[error("Channel {0} outside the queryable range")]
    ChannelOutOfRange(u16),

    /// A catch-all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}
