//! Timers, indicator LED, and one-shot hardware initialisation.

pub mod hw_init;
pub mod hw_timer;
pub mod indicator;
