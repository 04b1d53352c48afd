//! Sampling controller: the hexagonal core.
//!
//! [`SamplingController`] owns the connection state, the interval
//! aggregator and the interval configuration.  It exposes four entry points
//! (connect, disconnect, tick, interval write) that the main loop calls one
//! at a time as events are drained, so no two of them ever interleave.
//!
//! ```text
//!  ParticleSensorPort ──▶ ┌──────────────────────┐ ──▶ NotificationSink
//!                         │  SamplingController  │
//!  TimerPort/Indicator ◀──│  state · aggregator  │
//!                         └──────────────────────┘
//! ```

use core::num::NonZeroU8;

use log::{debug, info, warn};

use super::aggregator::{Aggregator, ChannelAverages};
use super::ports::{ConfigPort, IndicatorPort, NotificationSink, ParticleSensorPort, TimerPort};
use crate::config::SystemConfig;
use crate::error::{Error, SensorError};

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No peer connected; sampling suspended.
    Idle,
    /// Peer connected; one read cycle per tick.
    Sampling,
}

/// Diagnostic counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub ticks: u32,
    pub skipped_ticks: u32,
    pub intervals_closed: u32,
    pub empty_intervals: u32,
}

// ───────────────────────────────────────────────────────────────
// SamplingController
// ───────────────────────────────────────────────────────────────

pub struct SamplingController {
    state: ControllerState,
    aggregator: Aggregator,
    config: SystemConfig,
    /// Interval length requested by the peer (or loaded from NVS).
    interval: NonZeroU8,
    /// Interval length the running interval started with.
    active_interval: NonZeroU8,
    /// Ticks elapsed in the running interval.
    ticks_in_interval: u8,
    /// Last published pair this session; replayed when an interval has no samples.
    last_published: Option<ChannelAverages>,
    stats: ControllerStats,
    config_dirty: bool,
}

impl SamplingController {
    /// Build the controller in [`ControllerState::Idle`].
    ///
    /// An `interval_ticks` of 0 in `config` falls back to 1.
    pub fn new(config: SystemConfig) -> Self {
        let interval = NonZeroU8::new(config.interval_ticks).unwrap_or(NonZeroU8::MIN);
        Self {
            state: ControllerState::Idle,
            aggregator: Aggregator::new(),
            config,
            interval,
            active_interval: interval,
            ticks_in_interval: 0,
            last_published: None,
            stats: ControllerStats::default(),
            config_dirty: false,
        }
    }

    // ── Connection lifecycle ──────────────────────────────────

    /// Peer connected: start a fresh interval and the sampling timer.
    pub fn on_connect(&mut self, hw: &mut (impl TimerPort + IndicatorPort)) {
        if self.state == ControllerState::Sampling {
            debug!("on_connect while sampling, ignored");
            return;
        }

        self.aggregator.reset();
        self.ticks_in_interval = 0;
        self.last_published = None;
        self.active_interval = self.interval;
        self.state = ControllerState::Sampling;

        hw.stop_blink();
        hw.start_sampling(self.config.sample_period_ms);
        info!(
            "Sampling started (interval={} ticks @ {} ms)",
            self.active_interval, self.config.sample_period_ms
        );
    }

    /// Peer gone: stop sampling and go back to the idle blink.
    ///
    /// The aggregator is left as-is; the next connect resets it.
    pub fn on_disconnect(&mut self, hw: &mut (impl TimerPort + IndicatorPort)) {
        if self.state == ControllerState::Idle {
            debug!("on_disconnect while idle, ignored");
            return;
        }

        self.state = ControllerState::Idle;
        hw.cancel_sampling();
        hw.start_blink(self.config.blink_toggle_ms);
        info!(
            "Sampling stopped ({} samples discarded)",
            self.aggregator.sample_count()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one sampling tick: read → accumulate → maybe close and publish.
    ///
    /// A failed read still advances the interval; the tick simply
    /// contributes no sample.
    pub fn on_tick(&mut self, sensor: &mut impl ParticleSensorPort, sink: &mut impl NotificationSink) {
        if self.state != ControllerState::Sampling {
            return;
        }
        self.stats.ticks = self.stats.ticks.wrapping_add(1);

        match sensor.read_channels() {
            Ok(sample) => {
                self.aggregator.accumulate(sample.channel_a, sample.channel_b);
            }
            Err(SensorError::Codec(e)) => {
                debug_assert!(false, "malformed sensor payload: {e}");
                self.skip_tick(&SensorError::Codec(e));
            }
            Err(e) => self.skip_tick(&e),
        }

        self.ticks_in_interval += 1;
        if self.ticks_in_interval >= self.active_interval.get() {
            self.close_interval(sink);
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Peer wrote a new interval length.  The running interval keeps the
    /// length it started with; the new value applies from the next one.
    pub fn on_interval_config_write(&mut self, value: u8) -> Result<(), Error> {
        let Some(interval) = NonZeroU8::new(value) else {
            warn!("Interval write of 0 rejected (keeping {})", self.interval);
            return Err(Error::Config("interval must be >= 1 tick"));
        };

        if interval != self.interval {
            self.interval = interval;
            self.config.interval_ticks = value;
            self.config_dirty = true;
        }
        info!("Update interval set to {} ticks", value);
        Ok(())
    }

    /// Persist the configuration if a peer changed it.
    /// Returns `true` if a save happened.
    pub fn save_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Interval length that will be used from the next interval on.
    pub fn interval(&self) -> u8 {
        self.interval.get()
    }

    /// Interval length of the running interval.
    pub fn active_interval(&self) -> u8 {
        self.active_interval.get()
    }

    pub fn ticks_in_interval(&self) -> u8 {
        self.ticks_in_interval
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn skip_tick(&mut self, reason: &SensorError) {
        self.stats.skipped_ticks = self.stats.skipped_ticks.wrapping_add(1);
        warn!(
            "Tick {}/{} skipped: {}",
            self.ticks_in_interval + 1,
            self.active_interval,
            reason
        );
    }

    fn close_interval(&mut self, sink: &mut impl NotificationSink) {
        let averages = match self.aggregator.close_interval() {
            Some(avg) => avg,
            None => {
                self.stats.empty_intervals = self.stats.empty_intervals.wrapping_add(1);
                let fallback = self.last_published.unwrap_or_default();
                warn!(
                    "Interval closed with no samples, republishing A={} B={}",
                    fallback.channel_a, fallback.channel_b
                );
                fallback
            }
        };

        sink.publish(averages.channel_a, averages.channel_b);
        self.last_published = Some(averages);
        self.stats.intervals_closed = self.stats.intervals_closed.wrapping_add(1);
        info!(
            "PM counts (0.5-2.5um)={} (>2.5um)={}",
            averages.channel_a, averages.channel_b
        );

        self.ticks_in_interval = 0;
        self.active_interval = self.interval;
    }
}
