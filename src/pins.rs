//! GPIO pin assignments for the Cheapensor board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Rotation sensors (reed switch or hall effect, open-drain to GND)
// ---------------------------------------------------------------------------

/// Wheel magnet sensor.  Rising edge = one wheel revolution.
pub const WHEEL_SENSOR_GPIO: i32 = 4;
/// Crank magnet sensor.  Rising edge = one crank revolution.
pub const CRANK_SENSOR_GPIO: i32 = 5;

/// Both sensor inputs, wheel first.
pub const SENSOR_GPIOS: [i32; 2] = [WHEEL_SENSOR_GPIO, CRANK_SENSOR_GPIO];
