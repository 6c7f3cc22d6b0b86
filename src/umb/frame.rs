//! # UMB Frame Codec
//!
//! Pure translation between an (address, command, payload) triple and the
//! exact wire byte sequence, and the inverse. The wire layout is
//!
//! ```text
//! SOH | LEN | ADDR | CMD | PAYLOAD(LEN-2) | CRC_LO CRC_HI | EOT
//! ```
//!
//! where LEN counts ADDR + CMD + PAYLOAD and the CRC covers everything
//! between the markers. Any body byte that aliases SOH, EOT or the escape
//! marker is byte-stuffed before transmission: the escape marker is
//! emitted, followed by the byte XORed with 0x20. Omitting the stuffing
//! would create false frame boundaries on the wire.
//!
//! Decoding distinguishes "read more bytes" ([`FrameError::Truncated`])
//! from "discard and resynchronize" (all other variants); the transport
//! session keeps accumulating on the former and restarts the attempt on
//! the latter.

use crate::constants::{UMB_EOT, UMB_ESC, UMB_ESC_XOR, UMB_MAX_PAYLOAD, UMB_MIN_BODY_LEN, UMB_SOH};
use crate::umb::checksum::Checksum;
use bytes::{BufMut, BytesMut};
use nom::number::complete::le_u8;
use nom::IResult;
use thiserror::Error;

/// Errors produced while decoding a byte buffer into a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("no start marker in buffer")]
    NoStartMarker,

    #[error("length field {field} does not match body length {actual}")]
    LengthMismatch { field: u8, actual: usize },

    #[error("checksum mismatch: received {received:#06X}, calculated {calculated:#06X}")]
    ChecksumMismatch { received: u16, calculated: u16 },

    #[error("frame truncated, more bytes required")]
    Truncated,
}

/// A decoded UMB frame with markers and stuffing stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmbFrame {
    pub address: u8,
    pub command: u8,
    pub payload: Vec<u8>,
}

/// Encodes a request into its wire byte sequence.
///
/// The payload must fit the one-byte length field; requests built by the
/// query layer are far below that bound.
pub fn encode_frame(address: u8, command: u8, payload: &[u8], checksum: &dyn Checksum) -> Vec<u8> {
    assert!(payload.len() <= UMB_MAX_PAYLOAD, "payload exceeds LEN field");

    let mut body = Vec::with_capacity(payload.len() + 3);
    body.push((payload.len() + 2) as u8);
    body.push(address);
    body.push(command);
    body.extend_from_slice(payload);

    let crc = checksum.checksum(&body);

    let mut wire = BytesMut::with_capacity(body.len() * 2 + 6);
    wire.put_u8(UMB_SOH);
    for &b in &body {
        put_stuffed(&mut wire, b);
    }
    put_stuffed(&mut wire, (crc & 0x00FF) as u8);
    put_stuffed(&mut wire, (crc >> 8) as u8);
    wire.put_u8(UMB_EOT);
    wire.to_vec()
}

fn put_stuffed(wire: &mut BytesMut, byte: u8) {
    if byte == UMB_SOH || byte == UMB_EOT || byte == UMB_ESC {
        wire.put_u8(UMB_ESC);
        wire.put_u8(byte ^ UMB_ESC_XOR);
    } else {
        wire.put_u8(byte);
    }
}

/// Decodes and validates one frame from the buffer.
///
/// Bytes before the start marker are skipped; bytes after the end marker
/// are ignored. The checksum is verified before the length field so that
/// any corruption inside the body surfaces as [`FrameError::ChecksumMismatch`],
/// the dominant corruption signal on noisy serial links.
pub fn decode_frame(buffer: &[u8], checksum: &dyn Checksum) -> Result<UmbFrame, FrameError> {
    let start = buffer
        .iter()
        .position(|&b| b == UMB_SOH)
        .ok_or(FrameError::NoStartMarker)?;

    let body = unstuff_body(&buffer[start + 1..])?;

    if body.len() < UMB_MIN_BODY_LEN {
        return Err(FrameError::LengthMismatch {
            field: body.first().copied().unwrap_or(0),
            actual: body.len().saturating_sub(3),
        });
    }

    let (covered, crc_bytes) = body.split_at(body.len() - 2);
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    let calculated = checksum.checksum(covered);
    if received != calculated {
        return Err(FrameError::ChecksumMismatch {
            received,
            calculated,
        });
    }

    let (payload, (len, address, command)) =
        parse_body_header(covered).map_err(|_| FrameError::Truncated)?;
    let actual = covered.len() - 1;
    if len as usize != actual {
        return Err(FrameError::LengthMismatch { field: len, actual });
    }

    Ok(UmbFrame {
        address,
        command,
        payload: payload.to_vec(),
    })
}

/// Un-stuffs everything between the start and end markers.
///
/// A missing end marker or a pending escape at the end of the buffer means
/// the frame is still in flight.
fn unstuff_body(input: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut body = Vec::with_capacity(input.len());
    let mut bytes = input.iter();
    loop {
        match bytes.next() {
            Some(&UMB_EOT) => return Ok(body),
            Some(&UMB_ESC) => match bytes.next() {
                Some(&escaped) => body.push(escaped ^ UMB_ESC_XOR),
                None => return Err(FrameError::Truncated),
            },
            Some(&b) => body.push(b),
            None => return Err(FrameError::Truncated),
        }
    }
}

fn parse_body_header(input: &[u8]) -> IResult<&[u8], (u8, u8, u8)> {
    let (input, len) = le_u8(input)?;
    let (input, address) = le_u8(input)?;
    let (input, command) = le_u8(input)?;
    Ok((input, (len, address, command)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::umb::checksum::{Crc16, SumMod65536};

    #[test]
    fn test_encode_canonical_fixture() {
        // Conformance fixture: every byte position is fixed.
        let wire = encode_frame(0x01, 0x23, &[0x01, 0x00], &SumMod65536);
        assert_eq!(
            wire,
            vec![0x01, 0x1B, 0x24, 0x1B, 0x21, 0x23, 0x1B, 0x21, 0x00, 0x29, 0x00, 0x04]
        );
    }

    #[test]
    fn test_round_trip_plain_payload() {
        let wire = encode_frame(0x05, 0x23, &[0x71, 0x02], &Crc16);
        let frame = decode_frame(&wire, &Crc16).unwrap();
        assert_eq!(frame.address, 0x05);
        assert_eq!(frame.command, 0x23);
        assert_eq!(frame.payload, vec![0x71, 0x02]);
    }

    #[test]
    fn test_round_trip_marker_aliasing_payload() {
        // Payload full of bytes that collide with the frame markers.
        let payload = [UMB_SOH, UMB_EOT, UMB_ESC, UMB_SOH, 0x00, UMB_EOT];
        let wire = encode_frame(0x01, 0x2F, &payload, &Crc16);
        // No naked EOT before the terminator.
        assert_eq!(wire.iter().filter(|&&b| b == UMB_EOT).count(), 1);
        let frame = decode_frame(&wire, &Crc16).unwrap();
        assert_eq!(frame.payload, payload.to_vec());
    }

    #[test]
    fn test_decode_no_start_marker() {
        let buf = [0xFF, 0xA0, 0x55];
        assert_eq!(
            decode_frame(&buf, &Crc16),
            Err(FrameError::NoStartMarker)
        );
    }

    #[test]
    fn test_decode_skips_leading_noise() {
        let mut wire = vec![0x7E, 0xFF, 0x00];
        wire.extend(encode_frame(0x01, 0x23, &[0x64, 0x00], &Crc16));
        let frame = decode_frame(&wire, &Crc16).unwrap();
        assert_eq!(frame.command, 0x23);
    }

    #[test]
    fn test_decode_truncated_without_end_marker() {
        let wire = encode_frame(0x01, 0x23, &[0x64, 0x00], &Crc16);
        for cut in 1..wire.len() {
            assert_eq!(
                decode_frame(&wire[..cut], &Crc16),
                Err(FrameError::Truncated),
                "prefix of {cut} bytes should ask for more"
            );
        }
    }

    #[test]
    fn test_decode_truncated_on_pending_escape() {
        let buf = [UMB_SOH, 0x05, UMB_ESC];
        assert_eq!(decode_frame(&buf, &Crc16), Err(FrameError::Truncated));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut wire = encode_frame(0x01, 0x23, &[0x64, 0x00], &Crc16);
        // Corrupt the command byte in place.
        wire[3] ^= 0x40;
        assert!(matches!(
            decode_frame(&wire, &Crc16),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_length_mismatch_with_valid_checksum() {
        // Hand-build a body whose LEN lies but whose CRC is correct.
        let body = [0x05u8, 0x01, 0x23, 0x64, 0x00];
        let crc = Crc16.checksum(&body);
        let mut wire = vec![UMB_SOH];
        wire.extend_from_slice(&body);
        wire.push((crc & 0xFF) as u8);
        wire.push((crc >> 8) as u8);
        wire.push(UMB_EOT);
        assert_eq!(
            decode_frame(&wire, &Crc16),
            Err(FrameError::LengthMismatch { field: 5, actual: 4 })
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut wire = encode_frame(0x01, 0x23, &[0x64, 0x00], &Crc16);
        let expected = decode_frame(&wire, &Crc16).unwrap();
        wire.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode_frame(&wire, &Crc16).unwrap(), expected);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let wire = encode_frame(0x01, 0x23, &[], &Crc16);
        let frame = decode_frame(&wire, &Crc16).unwrap();
        assert!(frame.payload.is_empty());
    }
}
