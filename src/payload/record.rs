//! Per-channel query results.

use crate::payload::data::ChannelValue;
use crate::umb::status::StatusCode;
use serde::Serialize;

/// One result per requested channel.
///
/// The ordering of results always matches the caller's input channel
/// list, regardless of the order the device answered in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelResult {
    pub channel: u16,
    pub value: ChannelValue,
    pub status: StatusCode,
}

impl ChannelResult {
    /// A result for a channel that produced no usable value.
    pub fn no_data(channel: u16, status: StatusCode) -> Self {
        ChannelResult {
            channel,
            value: ChannelValue::NoData,
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
