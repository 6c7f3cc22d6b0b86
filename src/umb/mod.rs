//! The umb module contains the components responsible for the core UMB
//! protocol implementation: frame codec, checksum strategies, transport
//! session and query orchestration.

pub mod checksum;
pub mod frame;
pub mod protocol;
pub mod serial;
pub mod serial_mock;
pub mod status;
pub mod transport;

pub use checksum::{Checksum, Crc16, SumMod65536};
pub use frame::{decode_frame, encode_frame, FrameError, UmbFrame};
pub use protocol::{ClientConfig, UmbClient};
pub use serial::{SerialConfig, UmbDeviceHandle};
pub use status::{describe_status, StatusCode};
pub use transport::{SessionStats, TransportError, TransportSession, UmbPort};
