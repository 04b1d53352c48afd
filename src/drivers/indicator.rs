//! Single-colour indicator LED driver.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives one GPIO output configured by hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct IndicatorLed {
    pin: i32,
    lit: bool,
}

impl IndicatorLed {
    pub fn new() -> Self {
        Self::on_pin(pins::INDICATOR_LED_GPIO)
    }

    pub fn on_pin(pin: i32) -> Self {
        Self { pin, lit: false }
    }

    pub fn set(&mut self, lit: bool) {
        hw_init::gpio_write(self.pin, lit);
        self.lit = lit;
    }

    pub fn toggle(&mut self) {
        self.set(!self.lit);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

impl Default for IndicatorLed {
    fn default() -> Self {
        Self::new()
    }
}
