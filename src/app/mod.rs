//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the sampling rules for PMSense: connection-gated
//! sampling, interval averaging, and interval configuration.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod aggregator;
pub mod ports;
pub mod service;
