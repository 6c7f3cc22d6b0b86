//! # UMB Serial Communication
//!
//! Connecting the query layer to a physical RS-485 serial port. The
//! handle owns the port for its whole lifetime; dropping the handle
//! releases it on every exit path, which is what makes the scoped
//! acquire/release discipline hold.

use crate::constants::{UMB_CHANNEL_MAX, UMB_CHANNEL_MIN, UMB_DEFAULT_BAUDRATE};
use crate::error::UmbError;
use crate::payload::record::ChannelResult;
use crate::umb::protocol::{ClientConfig, UmbClient};
use crate::umb::transport::SessionStats;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;

/// Configuration for the serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: UMB_DEFAULT_BAUDRATE,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Handle to a UMB device reachable over a serial port.
pub struct UmbDeviceHandle {
    client: UmbClient<tokio_serial::SerialStream>,
}

impl UmbDeviceHandle {
    /// Connects with default serial settings (19200 8N1) and query config.
    pub async fn connect(port_name: &str) -> Result<UmbDeviceHandle, UmbError> {
        Self::connect_with_config(port_name, SerialConfig::default(), ClientConfig::default()).await
    }

    /// Connects with custom serial and query configuration.
    pub async fn connect_with_config(
        port_name: &str,
        serial: SerialConfig,
        config: ClientConfig,
    ) -> Result<UmbDeviceHandle, UmbError> {
        let port = tokio_serial::new(port_name, serial.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(serial.timeout)
            .open_native_async()
            .map_err(|e| UmbError::SerialPortError(e.to_string()))?;

        Ok(UmbDeviceHandle {
            client: UmbClient::new(port, config),
        })
    }

    /// Closes the serial port; dropping the handle has the same effect.
    pub async fn disconnect(self) -> Result<(), UmbError> {
        Ok(())
    }

    pub fn stats(&self) -> SessionStats {
        self.client.stats()
    }

    /// Requests one value from one channel.
    pub async fn query_single(&mut self, channel: u16) -> Result<ChannelResult, UmbError> {
        if !(UMB_CHANNEL_MIN..=UMB_CHANNEL_MAX).contains(&channel) {
            return Err(UmbError::ChannelOutOfRange(channel));
        }
        Ok(self.client.query_single(channel).await?)
    }

    /// Requests values from multiple channels, one exchange per channel.
    pub async fn query_multi(&mut self, channels: &[u16]) -> Result<Vec<ChannelResult>, UmbError> {
        Ok(self.client.query_multi(channels).await?)
    }

    /// Requests values from multiple channels under an overall deadline.
    pub async fn query_multi_with_deadline(
        &mut self,
        channels: &[u16],
        overall: Duration,
    ) -> Result<Vec<ChannelResult>, UmbError> {
        Ok(self
            .client
            .query_multi_with_deadline(channels, overall)
            .await?)
    }

    /// Requests values from multiple channels in one call.
    pub async fn query_multi_combined(
        &mut self,
        channels: &[u16],
    ) -> Result<Vec<ChannelResult>, UmbError> {
        Ok(self.client.query_multi_combined(channels).await?)
    }
}
