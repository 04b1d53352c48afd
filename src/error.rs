//! Unified error types for the PMSense firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! main loop's error handling uniform.  All variants are `Copy` so they can be
//! passed through the sampling controller without allocation.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The particle sensor could not produce a sample this tick.
    Sensor(SensorError),
    /// A BLE subsystem call failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration value rejected.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Which half of a register transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// Register-select write.
    Write,
    /// Payload read after the settle delay.
    Read,
}

/// A single I2C transaction did not complete.
///
/// Carries the HAL's [`ErrorKind`] so NACK, arbitration loss and timeouts
/// stay distinguishable in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError {
    pub op: BusOp,
    pub kind: ErrorKind,
}

impl BusError {
    pub const fn write(kind: ErrorKind) -> Self {
        Self {
            op: BusOp::Write,
            kind,
        }
    }

    pub const fn read(kind: ErrorKind) -> Self {
        Self {
            op: BusOp::Read,
            kind,
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            BusOp::Write => "register select",
            BusOp::Read => "payload read",
        };
        write!(f, "{op} failed ({})", self.kind)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer width does not match the register field being decoded.
    MalformedPayload { expected: usize, actual: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload { expected, actual } => {
                write!(f, "malformed payload: expected {expected} bytes, got {actual}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Reasons a status-gated read cycle produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed.
    Bus(BusError),
    /// Status register reported a nonzero (not ready / fault) byte.
    NotReady(u8),
    /// Decoded buffer had the wrong width.
    Codec(CodecError),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::NotReady(status) => write!(f, "sensor not ready (status=0x{status:02x})"),
            Self::Codec(e) => write!(f, "codec: {e}"),
        }
    }
}

impl From<BusError> for SensorError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<CodecError> for SensorError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Sensor(SensorError::Bus(e))
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Sensor(SensorError::Codec(e))
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    BleInitFailed,
    NotifyFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BleInitFailed => write!(f, "BLE init failed"),
            Self::NotifyFailed => write!(f, "BLE notify failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}
