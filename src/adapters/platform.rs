//! Platform adapter: bridges the timers and indicator LED to domain ports.
//!
//! Owns [`HwTimers`] and the [`IndicatorLed`], exposing them through
//! [`TimerPort`] and [`IndicatorPort`].  The blink timer only produces
//! `BlinkTick` events; the main loop turns each one into
//! [`PlatformAdapter::on_blink_tick`].

use crate::app::ports::{IndicatorPort, TimerPort};
use crate::drivers::hw_timer::HwTimers;
use crate::drivers::indicator::IndicatorLed;

/// Concrete adapter that combines the timers and LED behind port traits.
pub struct PlatformAdapter {
    timers: HwTimers,
    led: IndicatorLed,
}

impl PlatformAdapter {
    pub fn new(timers: HwTimers, led: IndicatorLed) -> Self {
        Self { timers, led }
    }

    /// Blink timer expired.  Ignored once blinking has been stopped, so a
    /// tick already queued at connect time cannot turn the LED off.
    pub fn on_blink_tick(&mut self) {
        if self.timers.blink_period_ms().is_some() {
            self.led.toggle();
        }
    }

    pub fn timers(&self) -> &HwTimers {
        &self.timers
    }

    pub fn led(&self) -> &IndicatorLed {
        &self.led
    }
}

// ── TimerPort implementation ──────────────────────────────────

impl TimerPort for PlatformAdapter {
    fn start_sampling(&mut self, period_ms: u32) {
        self.timers.start_sampling(period_ms);
    }

    fn cancel_sampling(&mut self) {
        self.timers.cancel_sampling();
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl IndicatorPort for PlatformAdapter {
    fn start_blink(&mut self, toggle_ms: u32) {
        self.timers.start_blink(toggle_ms);
    }

    fn stop_blink(&mut self) {
        self.timers.stop_blink();
        self.led.set(true);
    }
}
