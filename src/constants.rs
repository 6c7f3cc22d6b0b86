//! UMB Protocol Constants
//!
//! This module defines the framing constants, command codes and datatype
//! tags used by the Lufft UMB protocol implementation.

/// Start-of-frame marker (SOH)
pub const UMB_SOH: u8 = 0x01;

/// End-of-frame marker (EOT)
pub const UMB_EOT: u8 = 0x04;

/// Escape marker for byte-stuffing
pub const UMB_ESC: u8 = 0x1B;

/// XOR applied to a stuffed byte following the escape marker
pub const UMB_ESC_XOR: u8 = 0x20;

/// Online data request for a single channel
pub const UMB_CMD_ONLINE_DATA: u8 = 0x23;

/// Online data request packing several channels into one call
pub const UMB_CMD_ONLINE_DATA_MULTI: u8 = 0x2F;

// ----------------------------------------------------------------------------
// Response datatype tags
// ----------------------------------------------------------------------------

pub const UMB_TYPE_U8: u8 = 0x10;
pub const UMB_TYPE_I8: u8 = 0x11;
pub const UMB_TYPE_U16: u8 = 0x12;
pub const UMB_TYPE_I16: u8 = 0x13;
pub const UMB_TYPE_U32: u8 = 0x14;
pub const UMB_TYPE_I32: u8 = 0x15;
pub const UMB_TYPE_F32: u8 = 0x16;
pub const UMB_TYPE_F64: u8 = 0x17;
pub const UMB_TYPE_BOOL: u8 = 0x18;

// ----------------------------------------------------------------------------
// Frame geometry
// ----------------------------------------------------------------------------

/// Minimum un-stuffed body length: LEN + ADDR + CMD + CRC16
pub const UMB_MIN_BODY_LEN: usize = 5;

/// LEN is a single byte covering ADDR + CMD + payload
pub const UMB_MAX_PAYLOAD: usize = 253;

/// Largest number of channels a device accepts in one combined request
pub const UMB_MAX_CHANNELS_ONE_CALL: usize = 20;

// ----------------------------------------------------------------------------
// Defaults and channel range
// ----------------------------------------------------------------------------

pub const UMB_DEFAULT_ADDRESS: u8 = 0x01;
pub const UMB_DEFAULT_BAUDRATE: u32 = 19200;
pub const UMB_DEFAULT_MAX_RETRIES: u32 = 3;

/// Weather-station channels live in this range
pub const UMB_CHANNEL_MIN: u16 = 100;
pub const UMB_CHANNEL_MAX: u16 = 29999;
