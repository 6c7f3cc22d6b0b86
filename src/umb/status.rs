//! # UMB Status Codes
//!
//! Device-reported status codes are in-band values, not errors: a sensor
//! answering "invalid channel" has answered. The table below follows the
//! Lufft status byte; codes this crate does not know map to
//! [`StatusCode::Unknown`] instead of failing. The three driver-side
//! variants annotate results the device never produced: a failed exchange,
//! a deadline that ran out, and a value whose datatype tag could not be
//! decoded.

use serde::Serialize;
use std::fmt;

/// Per-channel outcome of a query, device-reported or driver-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusCode {
    Ok,
    UnknownCommand,
    InvalidParameter,
    InvalidHeaderVersion,
    InvalidCommandVersion,
    InvalidPassword,
    ReadError,
    WriteError,
    LengthTooGreat,
    InvalidAddress,
    InvalidChannel,
    CommandNotPossible,
    UnknownCalibrationCommand,
    CalibrationError,
    DeviceNotReady,
    UnderVoltage,
    HardwareError,
    MeasurementError,
    InitError,
    OsError,
    ConfigurationError,
    CalibrationInvalid,
    ConfigCrcError,
    CalibrationCrcError,
    CalibrationStep1,
    CalibrationOk,
    ChannelDeactivated,
    /// Device sent a status byte this crate does not know.
    Unknown(u8),
    /// The exchange for this channel failed at the transport level.
    TransportFailure,
    /// The overall deadline ran out before this channel was queried.
    Cancelled,
    /// The response datatype tag could not be decoded.
    DecodeUnsupported,
}

impl StatusCode {
    /// Maps the device status byte to its variant.
    pub fn from_raw(code: u8) -> Self {
        match code {
            0 => StatusCode::Ok,
            16 => StatusCode::UnknownCommand,
            17 => StatusCode::InvalidParameter,
            18 => StatusCode::InvalidHeaderVersion,
            19 => StatusCode::InvalidCommandVersion,
            20 => StatusCode::InvalidPassword,
            32 => StatusCode::ReadError,
            33 => StatusCode::WriteError,
            34 => StatusCode::LengthTooGreat,
            35 => StatusCode::InvalidAddress,
            36 => StatusCode::InvalidChannel,
            37 => StatusCode::CommandNotPossible,
            38 => StatusCode::UnknownCalibrationCommand,
            39 => StatusCode::CalibrationError,
            40 => StatusCode::DeviceNotReady,
            41 => StatusCode::UnderVoltage,
            42 => StatusCode::HardwareError,
            43 => StatusCode::MeasurementError,
            44 => StatusCode::InitError,
            45 => StatusCode::OsError,
            48 => StatusCode::ConfigurationError,
            49 => StatusCode::CalibrationInvalid,
            50 => StatusCode::ConfigCrcError,
            51 => StatusCode::CalibrationCrcError,
            52 => StatusCode::CalibrationStep1,
            53 => StatusCode::CalibrationOk,
            54 => StatusCode::ChannelDeactivated,
            other => StatusCode::Unknown(other),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    /// Human-readable meaning of the status, per the Lufft manual.
    pub fn describe(&self) -> &'static str {
        match self {
            StatusCode::Ok => "Command successful; no error; all OK",
            StatusCode::UnknownCommand => "Unknown command; not supported by this device",
            StatusCode::InvalidParameter => "Invalid parameter",
            StatusCode::InvalidHeaderVersion => "Invalid header version",
            StatusCode::InvalidCommandVersion => "Invalid version of the command",
            StatusCode::InvalidPassword => "Invalid password for command",
            StatusCode::ReadError => "Read error",
            StatusCode::WriteError => "Write error",
            StatusCode::LengthTooGreat => "Length too great; max. permissible length is designated in <maxlength>",
            StatusCode::InvalidAddress => "Invalid address / storage location",
            StatusCode::InvalidChannel => "Invalid channel",
            StatusCode::CommandNotPossible => "Command not possible in this mode",
            StatusCode::UnknownCalibrationCommand => "Unknown calibration command",
            StatusCode::CalibrationError => "Calibration error",
            StatusCode::DeviceNotReady => "Device not ready; e.g. initialization / calibration running",
            StatusCode::UnderVoltage => "Under-voltage",
            StatusCode::HardwareError => "Hardware error",
            StatusCode::MeasurementError => "Measurement error",
            StatusCode::InitError => "Error on device initialization",
            StatusCode::OsError => "Error in operating system",
            StatusCode::ConfigurationError => "Configuration error, default configuration was loaded",
            StatusCode::CalibrationInvalid => "Calibration error / the calibration is invalid, measurement not possible",
            StatusCode::ConfigCrcError => "CRC error on loading configuration; default configuration was loaded",
            StatusCode::CalibrationCrcError => "CRC error on loading calibration; measurement not possible",
            StatusCode::CalibrationStep1 => "Calibration Step 1",
            StatusCode::CalibrationOk => "Calibration OK",
            StatusCode::ChannelDeactivated => "Channel deactivated",
            StatusCode::Unknown(_) => "Unknown status code reported by device",
            StatusCode::TransportFailure => "Exchange failed: device unresponsive or response corrupt",
            StatusCode::Cancelled => "Query cancelled: overall deadline exhausted",
            StatusCode::DecodeUnsupported => "Response datatype not supported by this driver",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Unknown(code) => write!(f, "{} ({code})", self.describe()),
            _ => f.write_str(self.describe()),
        }
    }
}

/// Pure lookup from a status to its description string.
pub fn describe_status(code: StatusCode) -> &'static str {
    code.describe()
}
