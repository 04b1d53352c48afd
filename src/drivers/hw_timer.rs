//! Hardware timers using ESP-IDF's esp_timer API.
//!
//! Two independent periodic timers push events into the main-loop queue:
//! the sampling tick ([`Event::SampleTick`](crate::events::Event::SampleTick)) and the idle indicator blink
//! ([`Event::BlinkTick`](crate::events::Event::BlinkTick)).  On simulation targets the timers only record
//! their configured period.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event().

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::SampleTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn blink_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::BlinkTick);
}

/// One restartable periodic timer.
struct PeriodicTimer {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    name: &'static str,
    period_ms: Option<u32>,
}

impl PeriodicTimer {
    #[cfg(target_os = "espidf")]
    fn create(
        name: &'static str,
        c_name: &'static [u8],
        callback: unsafe extern "C" fn(*mut core::ffi::c_void),
    ) -> Result<Self, HwInitError> {
        let args = esp_timer_create_args_t {
            callback: Some(callback),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c_name.as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlives the call; handle is written once here.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
        Ok(Self {
            handle,
            name,
            period_ms: None,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn create(name: &'static str) -> Self {
        Self {
            name,
            period_ms: None,
        }
    }

    /// (Re)start with `period_ms`.  A running timer is stopped first.
    fn start(&mut self, period_ms: u32) {
        self.stop();
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: handle was created in `create` and is never deleted.
            let ret = unsafe { esp_timer_start_periodic(self.handle, u64::from(period_ms) * 1000) };
            if ret != ESP_OK {
                log::error!("hw_timer: {} start failed (rc={})", self.name, ret);
                return;
            }
        }
        self.period_ms = Some(period_ms);
        log::debug!("hw_timer: {} @ {} ms", self.name, period_ms);
    }

    fn stop(&mut self) {
        if self.period_ms.take().is_none() {
            return;
        }
        #[cfg(target_os = "espidf")]
        // SAFETY: see `start`.  Stopping an expired timer is harmless.
        unsafe {
            esp_timer_stop(self.handle);
        }
        log::debug!("hw_timer: {} stopped", self.name);
    }
}

/// Sampling and blink timers.
pub struct HwTimers {
    sample: PeriodicTimer,
    blink: PeriodicTimer,
}

impl HwTimers {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, HwInitError> {
        let sample = PeriodicTimer::create("sample", b"sample\0", sample_tick_cb)?;
        let blink = PeriodicTimer::create("blink", b"blink\0", blink_tick_cb)?;
        log::info!("hw_timer: sample + blink timers created");
        Ok(Self { sample, blink })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, HwInitError> {
        log::info!("hw_timer(sim): timers record periods only");
        Ok(Self {
            sample: PeriodicTimer::create("sample"),
            blink: PeriodicTimer::create("blink"),
        })
    }

    pub fn start_sampling(&mut self, period_ms: u32) {
        self.sample.start(period_ms);
    }

    pub fn cancel_sampling(&mut self) {
        self.sample.stop();
    }

    pub fn start_blink(&mut self, toggle_ms: u32) {
        self.blink.start(toggle_ms);
    }

    pub fn stop_blink(&mut self) {
        self.blink.stop();
    }

    pub fn sampling_period_ms(&self) -> Option<u32> {
        self.sample.period_ms
    }

    pub fn blink_period_ms(&self) -> Option<u32> {
        self.blink.period_ms
    }
}
