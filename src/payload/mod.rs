//! The payload module contains the components responsible for decoding
//! the value bytes of UMB responses into typed channel results.

pub mod data;
pub mod record;

pub use data::{decode_channel_value, ChannelValue, ValueError};
pub use record::ChannelResult;
