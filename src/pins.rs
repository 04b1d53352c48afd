//! GPIO / peripheral pin assignments for the PMSense board.
//!
//! Every driver references this module rather than hard-coding pin numbers.
//! Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// I²C bus: Panasonic SN-GCJA5 (5 V sensor, 3.3 V logic, external pull-ups)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Indicator LED (active HIGH)
// ---------------------------------------------------------------------------

/// Blinks while no central is connected, held on while sampling.
pub const INDICATOR_LED_GPIO: i32 = 11;
