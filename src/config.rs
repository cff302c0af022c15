//! Peripheral configuration parameters
//!
//! All tunable parameters for the Cheapensor sensor.  The firmware ships
//! with [`PeripheralConfig::default`]; the structure is serde-enabled so a
//! board variant can embed or log an override.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::csc::advertising::{AdvertisingPayload, DEFAULT_ADV_INTERVAL_US};
use crate::csc::gatt::{APPEARANCE_CYCLING_SPEED_CADENCE, CSC_SERVICE_UUID};
use crate::sensors::debounce::DebouncePolicy;

/// Default GAP device name.
pub const DEFAULT_DEVICE_NAME: &str = "cheapensor";

/// Shortest advertising interval the BLE core spec allows (20 ms).
pub const MIN_ADV_INTERVAL_US: u32 = 20_000;
/// Longest legacy advertising interval (10.24 s).
pub const MAX_ADV_INTERVAL_US: u32 = 10_240_000;

/// Where revolution triggers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorSource {
    /// Reed/hall switches on the wheel and crank GPIOs (rising edge).
    Gpio,
    /// A periodic timer fires one wheel and one crank revolution every
    /// `period_ms`.  Bench/demo mode, no hardware attached.
    Simulated { period_ms: u32 },
}

/// Core peripheral configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    // --- GAP ---
    /// Name carried in the advertising payload
    pub device_name: heapless::String<24>,
    /// Advertising interval in microseconds
    pub adv_interval_us: u32,

    // --- Sensors ---
    /// Revolution acceptance policy, shared by wheel and crank
    pub debounce: DebouncePolicy,
    /// Trigger source for revolutions
    pub sensor_source: SensorSource,

    // --- Diagnostics ---
    /// Log counters and raw measurement bytes after every send
    pub debug_measurements: bool,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // "cheapensor" always fits in 24 bytes.
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            device_name,
            adv_interval_us: DEFAULT_ADV_INTERVAL_US, // 500 ms
            debounce: DebouncePolicy::default(),
            sensor_source: SensorSource::Gpio,
            debug_measurements: false,
        }
    }
}

impl PeripheralConfig {
    /// Check every field; the first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }
        if AdvertisingPayload::build(
            &self.device_name,
            CSC_SERVICE_UUID,
            APPEARANCE_CYCLING_SPEED_CADENCE,
        )
        .is_err()
        {
            return Err(ConfigError::DeviceNameTooLong);
        }
        if !(MIN_ADV_INTERVAL_US..=MAX_ADV_INTERVAL_US).contains(&self.adv_interval_us) {
            return Err(ConfigError::AdvIntervalOutOfRange(self.adv_interval_us));
        }
        if let SensorSource::Simulated { period_ms: 0 } = self.sensor_source {
            return Err(ConfigError::ZeroSimulationPeriod);
        }
        Ok(())
    }
}

/// Reasons [`PeripheralConfig::validate`] can reject a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDeviceName,
    /// The name does not fit the 31-byte advertising payload.
    DeviceNameTooLong,
    AdvIntervalOutOfRange(u32),
    ZeroSimulationPeriod,
    /// Wheel geometry / speed cannot produce a debounce interval.
    InvalidDebounceGeometry,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDeviceName => write!(f, "device name is empty"),
            Self::DeviceNameTooLong => write!(f, "device name does not fit the advertising payload"),
            Self::AdvIntervalOutOfRange(us) => write!(
                f,
                "advertising interval {us} us outside {MIN_ADV_INTERVAL_US}..={MAX_ADV_INTERVAL_US}"
            ),
            Self::ZeroSimulationPeriod => write!(f, "simulated revolution period is zero"),
            Self::InvalidDebounceGeometry => {
                write!(f, "wheel circumference and max speed must be non-zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
