//! Interval aggregator for the two published count channels.
//!
//! Per-tick samples are `u16`, but the running sums are `u32`: an interval
//! is at most 255 ticks, so the sums cannot wrap and the truncated mean is
//! always back in `u16` range.

/// Averages produced when an interval closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelAverages {
    pub channel_a: u16,
    pub channel_b: u16,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sum_a: u32,
    sum_b: u32,
    samples: u32,
}

impl Aggregator {
    pub const fn new() -> Self {
        Self {
            sum_a: 0,
            sum_b: 0,
            samples: 0,
        }
    }

    /// Add one successful tick.
    pub fn accumulate(&mut self, channel_a: u16, channel_b: u16) {
        self.sum_a = self.sum_a.wrapping_add(u32::from(channel_a));
        self.sum_b = self.sum_b.wrapping_add(u32::from(channel_b));
        self.samples += 1;
    }

    /// Compute the truncated mean of each channel and start a new interval.
    ///
    /// Returns `None` when no tick in the interval produced a sample; the
    /// sums are reset either way.
    pub fn close_interval(&mut self) -> Option<ChannelAverages> {
        let averages = if self.samples == 0 {
            None
        } else {
            Some(ChannelAverages {
                channel_a: (self.sum_a / self.samples) as u16,
                channel_b: (self.sum_b / self.samples) as u16,
            })
        };
        self.reset();
        averages
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    pub fn sums(&self) -> (u32, u32) {
        (self.sum_a, self.sum_b)
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}
