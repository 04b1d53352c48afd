//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SamplingController (domain)
//! ```
//!
//! Driven adapters (sensor driver, BLE notifier, timers, indicator LED, NVS)
//! implement these traits.  The [`SamplingController`](super::service::SamplingController)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::SystemConfig;
use crate::error::SensorError;
use crate::sensors::ChannelSample;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one status-gated sensor cycle per call.
pub trait ParticleSensorPort {
    /// Read the two published channels.  Any error means "no sample this
    /// tick"; the caller decides how to absorb it.
    fn read_channels(&mut self) -> Result<ChannelSample, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Notification sink (driven adapter: domain → connected peer)
// ───────────────────────────────────────────────────────────────

/// Delivers interval averages to the connected peer.  Fire-and-forget: the
/// domain never learns whether the peer acknowledged.
pub trait NotificationSink {
    fn publish(&mut self, channel_a: u16, channel_b: u16);
}

// ───────────────────────────────────────────────────────────────
// Timer + indicator ports (driven adapters: domain → platform)
// ───────────────────────────────────────────────────────────────

/// Periodic sampling timer.  Each expiry must end up as exactly one
/// `on_tick` call on the controller.
pub trait TimerPort {
    fn start_sampling(&mut self, period_ms: u32);
    fn cancel_sampling(&mut self);
}

/// "Not connected" indicator.  Blinking while idle; held on while a peer
/// is connected.
pub trait IndicatorPort {
    fn start_blink(&mut self, toggle_ms: u32);
    /// Stop blinking and leave the indicator lit.
    fn stop_blink(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting.  Invalid values are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
