//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                     |
//! |------------|-------------------|---------------------------------|
//! | `ble`      | NotificationSink  | Bluedroid GATT server           |
//! | `nvs`      | ConfigPort        | NVS / in-memory store           |
//! | `platform` | TimerPort         | esp_timer (sample + blink)      |
//! |            | IndicatorPort     | Indicator LED GPIO              |
//!
//! The sensor port is implemented directly by the SN-GCJA5 driver in
//! [`crate::sensors`].

pub mod ble;
pub mod nvs;
pub mod platform;
