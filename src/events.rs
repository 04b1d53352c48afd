//! Callback-to-main-loop event queue.
//!
//! Events are produced by:
//! - the BLE GATT server callback (peer connect/disconnect, interval writes)
//! - esp_timer callbacks (sampling tick, idle blink)
//!
//! Events are consumed by the main loop, which hands them to the sampling
//! controller one at a time.  That is the only place controller state is
//! touched, so connect, disconnect, tick and config-write handling never
//! interleave.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GATTS cb    │────▶│  Event Queue │────▶│  Main Loop   │
//! │ esp_timer   │────▶│  (MPMC, cs)  │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // ── Link ──────────────────────────────────────────────
    /// A central connected.
    PeerConnected,
    /// The central disconnected.
    PeerDisconnected,
    /// The central wrote the interval characteristic.
    IntervalWritten(u8),

    // ── Timers ────────────────────────────────────────────
    /// Sampling timer expired.
    SampleTick,
    /// Idle indicator toggle.
    BlinkTick,
}

/// Bounded event queue shared between producer callbacks and the main loop.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        self.channel.try_send(event).is_ok()
    }

    pub fn pop(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

static EVENTS: EventQueue = EventQueue::new();

/// Push an event into the global queue.
/// Safe to call from any task or timer callback.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let ok = EVENTS.push(event);
    if !ok {
        log::warn!("Event queue full, dropped {:?}", event);
    }
    ok
}

/// Drain all pending events from the global queue into a callback.
pub fn drain_events(handler: impl FnMut(Event)) {
    EVENTS.drain(handler);
}
