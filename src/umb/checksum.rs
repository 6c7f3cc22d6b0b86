//! # UMB Frame Checksum
//!
//! The integrity value protecting a UMB frame body. The algorithm is kept
//! behind the [`Checksum`] trait so the codec and transport do not depend
//! on a particular polynomial or byte order.

/// Computes the 16-bit integrity value over a frame body.
///
/// Verification is exact equality of the recomputed value against the
/// transmitted one; there is no tolerance or partial match.
pub trait Checksum: Send + Sync {
    fn checksum(&self, data: &[u8]) -> u16;

    fn verify(&self, data: &[u8], transmitted: u16) -> bool {
        self.checksum(data) == transmitted
    }
}

/// CRC-16 with the reflected CCITT polynomial 0x8408 and initial value
/// 0xFFFF, the checksum Lufft devices compute over the frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16;

impl Checksum for Crc16 {
    fn checksum(&self, data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            let mut b = byte;
            for _ in 0..8 {
                let mix = (crc ^ b as u16) & 0x0001;
                crc >>= 1;
                if mix != 0 {
                    crc ^= 0x8408;
                }
                b >>= 1;
            }
        }
        crc
    }
}

/// Additive checksum: sum of all bytes modulo 65536.
///
/// Used as the cross-implementation conformance algorithm; real devices
/// speak [`Crc16`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SumMod65536;

impl Checksum for SumMod65536 {
    fn checksum(&self, data: &[u8]) -> u16 {
        data.iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
    }
}
