//! Revolution acceptance policy.
//!
//! A reed switch bounces and a magnet can wobble past a hall sensor, so
//! one physical revolution may raise several edges.  The debouncer decides
//! whether a raw trigger counts as a new revolution.
//!
//! | Policy            | Accepts when                                   |
//! |-------------------|------------------------------------------------|
//! | `MinimumInterval` | `now - last_accepted > min_interval_ms`        |
//! | `AlwaysAccept`    | always (timer-driven / pre-filtered sources)   |
//!
//! The default 167 ms is the shortest plausible revolution period at the
//! design top speed (about 50 km/h on a road wheel).

use log::trace;
use serde::{Deserialize, Serialize};

use super::channel::SensorChannel;
use crate::config::ConfigError;

/// Default minimum interval between accepted revolutions.
pub const DEFAULT_MIN_INTERVAL_MS: u32 = 167;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebouncePolicy {
    /// Count every trigger.
    AlwaysAccept,
    /// Reject triggers closer than `min_interval_ms` to the last accepted one.
    MinimumInterval { min_interval_ms: u32 },
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self::MinimumInterval {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
        }
    }
}

impl DebouncePolicy {
    /// Minimum-interval policy for a wheel of `circumference_mm` that never
    /// exceeds `max_speed_kmh`: one revolution takes at least
    /// `circumference / speed`.
    pub fn for_max_speed(circumference_mm: u32, max_speed_kmh: u32) -> Result<Self, ConfigError> {
        if circumference_mm == 0 || max_speed_kmh == 0 {
            return Err(ConfigError::InvalidDebounceGeometry);
        }
        // mm / (km/h) = mm / (1e6 mm / 3.6e6 ms) = mm * 3.6 / speed  [ms]
        let min_interval_ms = (u64::from(circumference_mm) * 36 / (u64::from(max_speed_kmh) * 10)) as u32;
        Ok(Self::MinimumInterval { min_interval_ms })
    }
}

/// Stateless gate applied to a channel; the channel carries the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    policy: DebouncePolicy,
}

impl Debouncer {
    pub const fn new(policy: DebouncePolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    /// Decide whether a trigger at `now_ms` is a new revolution.
    ///
    /// On acceptance the channel's count is incremented and its timestamp
    /// set to `now_ms`.  Rejected triggers leave the channel untouched.
    pub fn accept(&self, channel: &mut SensorChannel, now_ms: u32) -> bool {
        let accepted = match self.policy {
            DebouncePolicy::AlwaysAccept => true,
            DebouncePolicy::MinimumInterval { min_interval_ms } => {
                channel.elapsed_ms(now_ms) > min_interval_ms
            }
        };
        if accepted {
            channel.record(now_ms);
        } else {
            trace!(
                "debounce: rejected trigger {} ms after last revolution",
                channel.elapsed_ms(now_ms)
            );
        }
        accepted
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DebouncePolicy::default())
    }
}
