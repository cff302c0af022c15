//! Per-sensor cumulative state.

/// Which rotation sensor an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Wheel,
    Crank,
}

/// Cumulative revolutions and the time of the last accepted revolution.
///
/// `cumulative_count` only ever moves by one per accepted event and wraps
/// at 2^32.  `last_event_time_ms` is in raw clock milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorChannel {
    pub cumulative_count: u32,
    pub last_event_time_ms: u32,
}

impl SensorChannel {
    pub const fn new() -> Self {
        Self {
            cumulative_count: 0,
            last_event_time_ms: 0,
        }
    }

    /// Milliseconds since the last accepted event, wraparound-safe.
    pub const fn elapsed_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_event_time_ms)
    }

    /// Count one revolution at `now_ms`.
    pub(crate) fn record(&mut self, now_ms: u32) {
        self.cumulative_count = self.cumulative_count.wrapping_add(1);
        self.last_event_time_ms = now_ms;
    }
}
