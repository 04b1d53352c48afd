//! SN-GCJA5 register payload codec.
//!
//! Pure functions over byte buffers read from the sensor.  Every multi-byte
//! field is little-endian.  A buffer whose width does not match the field
//! being decoded is rejected with [`CodecError::MalformedPayload`]; nothing
//! is ever truncated or zero-padded.
//!
//! ## Full status block (26 bytes from register 0x00)
//!
//! | Offset | Width | Field                 |
//! |--------|-------|-----------------------|
//! | 0      | 4     | PM1.0 mass density    |
//! | 4      | 4     | PM2.5 mass density    |
//! | 8      | 4     | PM10 mass density     |
//! | 12     | 2     | 0.3 µm count          |
//! | 14     | 2     | 0.5 µm count          |
//! | 16     | 2     | 1.0 µm count          |
//! | 18     | 2     | reserved (not a count)|
//! | 20     | 2     | 2.5 µm count          |
//! | 22     | 2     | 5.0 µm count          |
//! | 24     | 2     | 7.5 µm count          |

use crate::error::CodecError;

pub const COUNT_WIDTH: usize = 2;
pub const DENSITY_WIDTH: usize = 4;
pub const COUNT_BLOCK_WIDTH: usize = 3 * COUNT_WIDTH;
pub const FULL_STATUS_WIDTH: usize = 26;
/// Width of the 0.5 µm + 1.0 µm count block read for channel A.
pub const CHANNEL_A_WIDTH: usize = 2 * COUNT_WIDTH;
/// Width of the 2.5 / 5.0 / 7.5 µm count block read for channel B.
pub const CHANNEL_B_WIDTH: usize = COUNT_BLOCK_WIDTH;

const PM1_0_OFFSET: usize = 0;
const PM2_5_OFFSET: usize = 4;
const PM10_OFFSET: usize = 8;
const COUNT_0_3_OFFSET: usize = 12;
const COUNT_0_5_OFFSET: usize = 14;
const COUNT_1_0_OFFSET: usize = 16;
// 18..20 is reserved in the sensor's register map.
const COUNT_2_5_OFFSET: usize = 20;
const COUNT_5_0_OFFSET: usize = 22;
const COUNT_7_5_OFFSET: usize = 24;

/// One decoded full-status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParticleCounts {
    /// PM1.0 mass density (µg/m³).
    pub pm1_0: u32,
    /// PM2.5 mass density (µg/m³).
    pub pm2_5: u32,
    /// PM10 mass density (µg/m³).
    pub pm10: u32,
    pub count_0_3: u16,
    pub count_0_5: u16,
    pub count_1_0: u16,
    pub count_2_5: u16,
    pub count_5_0: u16,
    pub count_7_5: u16,
}

impl ParticleCounts {
    /// Channel pair as published over BLE.
    pub fn channels(&self) -> ChannelSample {
        ChannelSample {
            channel_a: self.count_0_5.wrapping_add(self.count_1_0),
            channel_b: self
                .count_2_5
                .wrapping_add(self.count_5_0)
                .wrapping_add(self.count_7_5),
        }
    }
}

/// Per-tick channel pair fed to the aggregator.
///
/// Sums use the register width (`u16`, wrapping), matching what a single
/// tick has always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSample {
    /// 0.5 µm – 2.5 µm particle count.
    pub channel_a: u16,
    /// > 2.5 µm particle count.
    pub channel_b: u16,
}

impl ChannelSample {
    /// Build a sample from the 0.5 µm block (2 counts) and the 2.5 µm block
    /// (3 counts).
    pub fn decode(small: &[u8], large: &[u8]) -> Result<Self, CodecError> {
        check_width(small, CHANNEL_A_WIDTH)?;
        check_width(large, CHANNEL_B_WIDTH)?;

        let channel_a = decode_count16(&small[0..2])?.wrapping_add(decode_count16(&small[2..4])?);
        let channel_b = decode_count16(&large[0..2])?
            .wrapping_add(decode_count16(&large[2..4])?)
            .wrapping_add(decode_count16(&large[4..6])?);

        Ok(Self {
            channel_a,
            channel_b,
        })
    }
}

fn check_width(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(CodecError::MalformedPayload {
            expected,
            actual: bytes.len(),
        })
    }
}

/// Decode one little-endian particle count.
pub fn decode_count16(bytes: &[u8]) -> Result<u16, CodecError> {
    let raw: [u8; COUNT_WIDTH] = bytes.try_into().map_err(|_| CodecError::MalformedPayload {
        expected: COUNT_WIDTH,
        actual: bytes.len(),
    })?;
    Ok(u16::from_le_bytes(raw))
}

/// Decode one little-endian mass-density value.
pub fn decode_density32(bytes: &[u8]) -> Result<u32, CodecError> {
    let raw: [u8; DENSITY_WIDTH] = bytes.try_into().map_err(|_| CodecError::MalformedPayload {
        expected: DENSITY_WIDTH,
        actual: bytes.len(),
    })?;
    Ok(u32::from_le_bytes(raw))
}

/// Decode the 26-byte block starting at register 0x00.
pub fn decode_full_status(bytes: &[u8]) -> Result<ParticleCounts, CodecError> {
    check_width(bytes, FULL_STATUS_WIDTH)?;

    let density = |offset: usize| decode_density32(&bytes[offset..offset + DENSITY_WIDTH]);
    let count = |offset: usize| decode_count16(&bytes[offset..offset + COUNT_WIDTH]);

    Ok(ParticleCounts {
        pm1_0: density(PM1_0_OFFSET)?,
        pm2_5: density(PM2_5_OFFSET)?,
        pm10: density(PM10_OFFSET)?,
        count_0_3: count(COUNT_0_3_OFFSET)?,
        count_0_5: count(COUNT_0_5_OFFSET)?,
        count_1_0: count(COUNT_1_0_OFFSET)?,
        count_2_5: count(COUNT_2_5_OFFSET)?,
        count_5_0: count(COUNT_5_0_OFFSET)?,
        count_7_5: count(COUNT_7_5_OFFSET)?,
    })
}

/// Truncated mean of three consecutive counts.
pub fn average_of_three(bytes: &[u8]) -> Result<u16, CodecError> {
    check_width(bytes, COUNT_BLOCK_WIDTH)?;

    let mut total: u32 = 0;
    for chunk in bytes.chunks_exact(COUNT_WIDTH) {
        total += u32::from(decode_count16(chunk)?);
    }
    // Mean of three u16 values always fits in u16.
    Ok((total / 3) as u16)
}
