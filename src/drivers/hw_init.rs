//! One-shot hardware peripheral initialization.
//!
//! Configures the indicator GPIO with raw ESP-IDF sys calls and brings up
//! the sensor I2C bus through esp-idf-hal.  Called once from `main()`
//! before the event loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    I2cInitFailed(i32),
    TimerCreateFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc)  => write!(f, "GPIO config failed (rc={})", rc),
            Self::I2cInitFailed(rc)     => write!(f, "I2C driver install failed (rc={})", rc),
            Self::TimerCreateFailed(rc) => write!(f, "esp_timer create failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(match e {
            HwInitError::GpioConfigFailed(_) => "gpio",
            HwInitError::I2cInitFailed(_) => "i2c",
            HwInitError::TimerCreateFailed(_) => "timer",
        })
    }
}

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before event loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped (indicator on GPIO{})", pins::INDICATOR_LED_GPIO);
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::INDICATOR_LED_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::INDICATOR_LED_GPIO, 0) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Sensor I2C bus ────────────────────────────────────────────

/// Install the I2C master driver on the sensor bus.
///
/// The returned driver implements `embedded_hal::i2c::I2c` and is handed
/// straight to the SN-GCJA5 driver.
#[cfg(target_os = "espidf")]
pub fn init_sensor_bus(
    i2c: esp_idf_hal::i2c::I2C0,
    frequency_hz: u32,
) -> Result<esp_idf_hal::i2c::I2cDriver<'static>, HwInitError> {
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::units::Hertz;

    // SAFETY: the bus pins are claimed by nothing else in this firmware;
    // pins.rs is the only place they are assigned.
    let (sda, scl) = unsafe {
        (
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
        )
    };
    let config = I2cConfig::new().baudrate(Hertz(frequency_hz));
    let driver = I2cDriver::new(i2c, sda, scl, &config)
        .map_err(|e| HwInitError::I2cInitFailed(e.code()))?;

    info!(
        "hw_init: I2C0 up (SDA={} SCL={} @ {} Hz)",
        pins::I2C_SDA_GPIO, pins::I2C_SCL_GPIO, frequency_hz
    );
    Ok(driver)
}
