//! Sensor subsystem: the SN-GCJA5 register codec and bus driver.
//!
//! The driver implements [`ParticleSensorPort`](crate::app::ports::ParticleSensorPort)
//! so the sampling controller never touches the bus directly.

pub mod codec;
pub mod sngcja5;

pub use codec::{ChannelSample, ParticleCounts};
pub use sngcja5::{Register, Sngcja5};
