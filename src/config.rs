//! System configuration parameters
//!
//! All tunable parameters for the PMSense peripheral.
//! The sample interval can be overridden by a connected peer over BLE and is
//! persisted to NVS.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Advertised BLE name capacity (bytes).
pub const DEVICE_NAME_CAP: usize = 24;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensor bus ---
    /// 7-bit I2C address of the SN-GCJA5.
    pub i2c_address: u8,
    /// I2C clock (Hz).
    pub i2c_frequency_hz: u32,
    /// Delay between register select and payload read (µs).
    pub settle_delay_us: u32,
    /// Time the sensor needs after power-up before the first read (seconds).
    pub warmup_secs: u16,

    // --- Sampling ---
    /// Sampling tick period (milliseconds). The sensor refreshes once per second.
    pub sample_period_ms: u32,
    /// Ticks per published average.
    pub interval_ticks: u8,

    // --- Indicator ---
    /// LED toggle period while no peer is connected (milliseconds).
    pub blink_toggle_ms: u32,

    // --- BLE ---
    pub device_name: heapless::String<DEVICE_NAME_CAP>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("PMsense");

        Self {
            // Sensor bus
            i2c_address: 0x33,
            i2c_frequency_hz: 400_000, // fast mode
            settle_delay_us: 600,
            warmup_secs: 8,

            // Sampling
            sample_period_ms: 1000, // 1 Hz
            interval_ticks: 10,     // one publish per 10 s

            // Indicator
            blink_toggle_ms: 1000,

            device_name,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_address > 0x7F {
            return Err(ConfigError::ValidationFailed("i2c_address must be 7-bit"));
        }
        if !(10_000..=1_000_000).contains(&self.i2c_frequency_hz) {
            return Err(ConfigError::ValidationFailed(
                "i2c_frequency_hz must be 10 kHz–1 MHz",
            ));
        }
        if self.settle_delay_us > 100_000 {
            return Err(ConfigError::ValidationFailed(
                "settle_delay_us must be <= 100 ms",
            ));
        }
        if !(100..=60_000).contains(&self.sample_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "sample_period_ms must be 100–60000",
            ));
        }
        if self.interval_ticks == 0 {
            return Err(ConfigError::ValidationFailed("interval_ticks must be >= 1"));
        }
        if self.blink_toggle_ms == 0 {
            return Err(ConfigError::ValidationFailed("blink_toggle_ms must be > 0"));
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name must not be empty"));
        }
        Ok(())
    }
}
