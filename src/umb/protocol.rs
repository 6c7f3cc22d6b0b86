//! # UMB Query Orchestration
//!
//! Translates caller intent (channel numbers) into protocol requests and
//! assembles typed per-channel results. Three query modes share the same
//! mechanics and differ only in request shaping:
//!
//! - single: one channel, one frame, one exchange;
//! - multi: one independent exchange per channel, strictly sequential
//!   (the bus is half-duplex), results in caller order, per-channel
//!   failures degrade to a `TransportFailure` status instead of aborting
//!   the remaining channels;
//! - combined: all channel ids packed into one request, one exchange; the
//!   response entries are mapped back by their echoed channel id, never
//!   by position, because devices may omit or reorder entries for
//!   unconfigured channels.

use crate::constants::*;
use crate::logging::log_warn;
use crate::payload::data::{decode_channel_value, ChannelValue};
use crate::payload::record::ChannelResult;
use crate::umb::checksum::{Checksum, Crc16};
use crate::umb::frame::{encode_frame, UmbFrame};
use crate::umb::status::StatusCode;
use crate::umb::transport::{SessionStats, TransportError, TransportSession, UmbPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Caller-supplied query configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bus address of the device being queried.
    pub address: u8,
    /// Per-exchange read timeout.
    pub timeout: Duration,
    /// Further attempts after the first failed one.
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: UMB_DEFAULT_ADDRESS,
            timeout: Duration::from_secs(1),
            max_retries: UMB_DEFAULT_MAX_RETRIES,
        }
    }
}

/// High-level query interface over one transport session.
pub struct UmbClient<P: UmbPort> {
    session: TransportSession<P>,
    config: ClientConfig,
    checksum: Arc<dyn Checksum>,
}

impl<P: UmbPort> UmbClient<P> {
    /// Creates a client speaking the device CRC.
    pub fn new(port: P, config: ClientConfig) -> Self {
        Self::with_checksum(port, config, Arc::new(Crc16))
    }

    /// Creates a client with a caller-chosen checksum algorithm.
    pub fn with_checksum(port: P, config: ClientConfig, checksum: Arc<dyn Checksum>) -> Self {
        UmbClient {
            session: TransportSession::new(port, Arc::clone(&checksum)),
            config,
            checksum,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Queries one channel; transport failures are hard errors here.
    pub async fn query_single(&mut self, channel: u16) -> Result<ChannelResult, TransportError> {
        let request = self.single_request(channel);
        let response = self
            .session
            .exchange(&request, self.config.max_retries, self.config.timeout)
            .await?;
        Ok(parse_single_response(channel, &response))
    }

    async fn query_single_until(
        &mut self,
        channel: u16,
        deadline: Instant,
    ) -> Result<ChannelResult, TransportError> {
        let request = self.single_request(channel);
        let response = self
            .session
            .exchange_until(&request, self.config.max_retries, self.config.timeout, deadline)
            .await?;
        Ok(parse_single_response(channel, &response))
    }

    fn single_request(&self, channel: u16) -> Vec<u8> {
        encode_frame(
            self.config.address,
            UMB_CMD_ONLINE_DATA,
            &channel.to_le_bytes(),
            self.checksum.as_ref(),
        )
    }

    /// Queries several channels with one exchange per channel.
    ///
    /// A failed exchange marks that channel `TransportFailure` and the
    /// remaining channels are still attempted; only `Busy` aborts.
    pub async fn query_multi(
        &mut self,
        channels: &[u16],
    ) -> Result<Vec<ChannelResult>, TransportError> {
        let mut results = Vec::with_capacity(channels.len());
        for &channel in channels {
            match self.query_single(channel).await {
                Ok(result) => results.push(result),
                Err(TransportError::Busy) => return Err(TransportError::Busy),
                Err(e) => {
                    log_warn(&format!("channel {channel} exchange failed: {e}"));
                    results.push(ChannelResult::no_data(channel, StatusCode::TransportFailure));
                }
            }
        }
        Ok(results)
    }

    /// Like [`query_multi`](Self::query_multi) with an overall deadline.
    ///
    /// Every attempt, retries included, runs with the configured timeout
    /// shrunk to the time still left, and no request is issued once the
    /// deadline has passed; the remaining channels are returned as
    /// `Cancelled` without touching the bus.
    pub async fn query_multi_with_deadline(
        &mut self,
        channels: &[u16],
        overall: Duration,
    ) -> Result<Vec<ChannelResult>, TransportError> {
        let deadline = Instant::now() + overall;
        let mut results = Vec::with_capacity(channels.len());
        for &channel in channels {
            if deadline.saturating_duration_since(Instant::now()).is_zero() {
                results.push(ChannelResult::no_data(channel, StatusCode::Cancelled));
                continue;
            }
            match self.query_single_until(channel, deadline).await {
                Ok(result) => results.push(result),
                Err(TransportError::Busy) => return Err(TransportError::Busy),
                Err(e) => {
                    log_warn(&format!("channel {channel} exchange failed: {e}"));
                    results.push(ChannelResult::no_data(channel, StatusCode::TransportFailure));
                }
            }
        }
        Ok(results)
    }

    /// Queries several channels packed into one request per 20 channels.
    ///
    /// Requested channels the device did not answer for are reported as
    /// `InvalidChannel`. A failed exchange degrades every channel of that
    /// request to `TransportFailure`; only `Busy` aborts.
    pub async fn query_multi_combined(
        &mut self,
        channels: &[u16],
    ) -> Result<Vec<ChannelResult>, TransportError> {
        let mut results = Vec::with_capacity(channels.len());
        for chunk in channels.chunks(UMB_MAX_CHANNELS_ONE_CALL) {
            let mut payload = Vec::with_capacity(1 + chunk.len() * 2);
            payload.push(chunk.len() as u8);
            for &channel in chunk {
                payload.extend_from_slice(&channel.to_le_bytes());
            }
            let request = encode_frame(
                self.config.address,
                UMB_CMD_ONLINE_DATA_MULTI,
                &payload,
                self.checksum.as_ref(),
            );
            match self
                .session
                .exchange(&request, self.config.max_retries, self.config.timeout)
                .await
            {
                Ok(response) => results.extend(map_combined_response(chunk, &response)),
                Err(TransportError::Busy) => return Err(TransportError::Busy),
                Err(e) => {
                    log_warn(&format!("combined exchange failed: {e}"));
                    results.extend(
                        chunk
                            .iter()
                            .map(|&ch| ChannelResult::no_data(ch, StatusCode::TransportFailure)),
                    );
                }
            }
        }
        Ok(results)
    }
}

/// Interprets a single-channel response payload:
/// `[status, ch_lo, ch_hi, type_tag, value_bytes...]`.
fn parse_single_response(channel: u16, frame: &UmbFrame) -> ChannelResult {
    if frame.command != UMB_CMD_ONLINE_DATA || frame.payload.is_empty() {
        return ChannelResult::no_data(channel, StatusCode::DecodeUnsupported);
    }

    let status = StatusCode::from_raw(frame.payload[0]);
    if !status.is_ok() {
        return ChannelResult::no_data(channel, status);
    }

    if frame.payload.len() < 4 {
        return ChannelResult::no_data(channel, StatusCode::DecodeUnsupported);
    }
    let echoed = u16::from_le_bytes([frame.payload[1], frame.payload[2]]);
    if echoed != channel {
        log_warn(&format!(
            "response echoes channel {echoed}, expected {channel}"
        ));
        return ChannelResult::no_data(channel, StatusCode::DecodeUnsupported);
    }

    match decode_channel_value(frame.payload[3], &frame.payload[4..]) {
        Ok(value) => ChannelResult {
            channel,
            value,
            status,
        },
        Err(e) => {
            log_warn(&format!("channel {channel}: {e}"));
            ChannelResult::no_data(channel, StatusCode::DecodeUnsupported)
        }
    }
}

/// Maps a combined response back onto the requested channel order.
///
/// Payload layout: `[count]` then per entry
/// `[sub_len, status, ch_lo, ch_hi, type_tag, value_bytes...]` where
/// `sub_len` counts the bytes after it in the entry.
fn map_combined_response(channels: &[u16], frame: &UmbFrame) -> Vec<ChannelResult> {
    let mut by_channel: HashMap<u16, (ChannelValue, StatusCode)> = HashMap::new();

    if frame.command == UMB_CMD_ONLINE_DATA_MULTI && !frame.payload.is_empty() {
        let mut offset = 1usize;
        while offset < frame.payload.len() {
            let sub_len = frame.payload[offset] as usize;
            let Some(entry) = frame.payload.get(offset + 1..offset + 1 + sub_len) else {
                log_warn("combined response entry overruns payload");
                break;
            };
            offset += 1 + sub_len;

            if entry.len() < 4 {
                continue;
            }
            let status = StatusCode::from_raw(entry[0]);
            let echoed = u16::from_le_bytes([entry[1], entry[2]]);
            let value = if status.is_ok() {
                match decode_channel_value(entry[3], &entry[4..]) {
                    Ok(value) => value,
                    Err(e) => {
                        log_warn(&format!("channel {echoed}: {e}"));
                        by_channel
                            .entry(echoed)
                            .or_insert((ChannelValue::NoData, StatusCode::DecodeUnsupported));
                        continue;
                    }
                }
            } else {
                ChannelValue::NoData
            };
            by_channel.entry(echoed).or_insert((value, status));
        }
    }

    channels
        .iter()
        .map(|&channel| match by_channel.remove(&channel) {
            Some((value, status)) => ChannelResult {
                channel,
                value,
                status,
            },
            None => ChannelResult::no_data(channel, StatusCode::InvalidChannel),
        })
        .collect()
}
