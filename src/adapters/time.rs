//! ESP32 time adapter.
//!
//! Provides the millisecond clock behind [`ClockPort`].
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic,
//!   callable from ISR context).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! Both truncate to `u32` milliseconds, which wraps after ~49.7 days.

use crate::app::ports::ClockPort;

/// Milliseconds since boot, truncated to 32 bits.
///
/// Used directly by the GPIO ISRs and the simulation timer to stamp
/// revolution triggers at the moment they happen.
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u32 {
    ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000) as u32
}

#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u32 {
    use std::sync::OnceLock;
    static START: OnceLock<std::time::Instant> = OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_millis() as u32
}

/// Clock adapter for the ESP32 platform.
pub struct EspClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for EspClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EspClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for EspClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u32 {
        uptime_ms()
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
