//! Panasonic SN-GCJA5 particulate-matter sensor driver.
//!
//! Every read is a two-step transaction: write the register selector, wait
//! for the sensor to latch it, then read the payload.  A failed select skips
//! the read entirely so callers never see stale or partial data.
//! Select and read are two STOP-terminated transactions, not a repeated
//! start: the settle delay has to sit between them, which `write_read` can't do.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::i2c::I2c` + `embedded_hal::delay::DelayNs`.
//! On ESP-IDF: `I2cDriver` and `Ets` from esp-idf-hal.
//! On host/test: the mock bus in `tests/integration/mock_hw.rs`.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::debug;

use super::codec::{self, CHANNEL_A_WIDTH, CHANNEL_B_WIDTH, ChannelSample, FULL_STATUS_WIDTH, ParticleCounts};
use crate::app::ports::ParticleSensorPort;
use crate::error::{BusError, SensorError};

/// 7-bit bus address.
pub const DEFAULT_ADDRESS: u8 = 0x33;
/// Time the sensor needs between register select and payload read.
pub const DEFAULT_SETTLE_US: u32 = 600;

/// Register selectors used by this driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Start of the 26-byte full status block (PM1.0 density).
    FullStatus = 0x00,
    /// 0.5 µm count, followed by the 1.0 µm count.
    Count0_5 = 0x0E,
    /// 2.5 µm count, followed by the 5.0 µm and 7.5 µm counts.
    Count2_5 = 0x14,
    /// One-byte sensor status. Zero means data is valid.
    Status = 0x26,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

pub struct Sngcja5<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    settle_us: u32,
}

impl<I2C, D> Sngcja5<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_config(i2c, delay, DEFAULT_ADDRESS, DEFAULT_SETTLE_US)
    }

    pub fn with_config(i2c: I2C, delay: D, address: u8, settle_us: u32) -> Self {
        Self {
            i2c,
            delay,
            address,
            settle_us,
        }
    }

    /// Select `register`, settle, then read exactly `N` bytes.
    pub fn read_register<const N: usize>(&mut self, register: Register) -> Result<[u8; N], BusError> {
        self.i2c
            .write(self.address, &[register.addr()])
            .map_err(|e| BusError::write(e.kind()))?;

        self.delay.delay_us(self.settle_us);

        let mut buf = [0u8; N];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|e| BusError::read(e.kind()))?;
        Ok(buf)
    }

    pub fn read_status(&mut self) -> Result<u8, BusError> {
        let [status] = self.read_register::<1>(Register::Status)?;
        Ok(status)
    }

    /// Status-gated read of both published channels.
    ///
    /// A nonzero status aborts the cycle before any count register is read.
    pub fn read_channels(&mut self) -> Result<ChannelSample, SensorError> {
        let status = self.read_status()?;
        if status != 0 {
            return Err(SensorError::NotReady(status));
        }

        let small = self.read_register::<CHANNEL_A_WIDTH>(Register::Count0_5)?;
        let large = self.read_register::<CHANNEL_B_WIDTH>(Register::Count2_5)?;
        let sample = ChannelSample::decode(&small, &large)?;
        debug!(
            "SN-GCJA5: A={} B={}",
            sample.channel_a, sample.channel_b
        );
        Ok(sample)
    }

    /// Read and decode every density and count register in one transaction.
    pub fn read_full_status(&mut self) -> Result<ParticleCounts, SensorError> {
        let buf = self.read_register::<FULL_STATUS_WIDTH>(Register::FullStatus)?;
        Ok(codec::decode_full_status(&buf)?)
    }

    /// Hand the bus and delay back (e.g. to re-init after a fault).
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D> ParticleSensorPort for Sngcja5<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    fn read_channels(&mut self) -> Result<ChannelSample, SensorError> {
        Sngcja5::read_channels(self)
    }
}
