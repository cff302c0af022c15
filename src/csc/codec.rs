//! CSC Measurement encoding.
//!
//! Fixed 11-byte little-endian layout:
//!
//! ```text
//!  0      1..=4             5..=6            7..=8            9..=10
//! ┌────┬──────────────────┬────────────────┬────────────────┬────────────────┐
//! │0x03│ wheel revs (u32) │ wheel time u16 │ crank revs u16 │ crank time u16 │
//! └────┴──────────────────┴────────────────┴────────────────┴────────────────┘
//! ```
//!
//! Event times are in 1/1024 s.  The crank counter and both event times
//! are truncated to 16 bits as the profile's field widths require; the
//! central reconstructs deltas with wrapping arithmetic.

use crate::sensors::channel::SensorChannel;

/// Encoded measurement length in bytes.
pub const MEASUREMENT_LEN: usize = 11;

/// Flags bit: wheel revolution data present.
pub const FLAG_WHEEL_REVOLUTION_DATA: u8 = 0x01;
/// Flags bit: crank revolution data present.
pub const FLAG_CRANK_REVOLUTION_DATA: u8 = 0x02;

/// Features advertised by this sensor (and the measurement flags byte).
pub const CSC_FEATURES: u8 = FLAG_WHEEL_REVOLUTION_DATA | FLAG_CRANK_REVOLUTION_DATA;

/// One encoded CSC measurement.
pub type Measurement = [u8; MEASUREMENT_LEN];

/// Value of the CSC Feature characteristic (`0x0003`, u16 LE).
pub const fn feature_value() -> [u8; 2] {
    (CSC_FEATURES as u16).to_le_bytes()
}

/// Convert milliseconds to 1/1024-second ticks, rounded half up, then
/// truncated to the 16-bit event-time field.
///
/// Integer arithmetic keeps the conversion exact across the whole `u32`
/// millisecond range.
pub const fn ms_to_event_time(ms: u32) -> u16 {
    ((ms as u64 * 1024 + 500) / 1000) as u16
}

/// Both channels frozen at the moment a measurement is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSnapshot {
    pub wheel: SensorChannel,
    pub crank: SensorChannel,
}

impl MeasurementSnapshot {
    pub fn capture(wheel: &SensorChannel, crank: &SensorChannel) -> Self {
        Self {
            wheel: *wheel,
            crank: *crank,
        }
    }

    pub fn encode(&self) -> Measurement {
        encode(&self.wheel, &self.crank)
    }
}

/// Encode the wheel and crank channels into a CSC measurement.
pub fn encode(wheel: &SensorChannel, crank: &SensorChannel) -> Measurement {
    let mut out = [0u8; MEASUREMENT_LEN];
    out[0] = CSC_FEATURES;
    out[1..5].copy_from_slice(&wheel.cumulative_count.to_le_bytes());
    out[5..7].copy_from_slice(&ms_to_event_time(wheel.last_event_time_ms).to_le_bytes());
    out[7..9].copy_from_slice(&(crank.cumulative_count as u16).to_le_bytes());
    out[9..11].copy_from_slice(&ms_to_event_time(crank.last_event_time_ms).to_le_bytes());
    out
}
