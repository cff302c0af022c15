//! Cycling Speed & Cadence profile: wire-level pieces.
//!
//! ```text
//!   SensorChannel ×2 ──▶ codec::encode ──▶ [u8; 11] ──▶ notify fan-out
//!   name + UUID + appearance ──▶ advertising::AdvertisingPayload
//!   gatt::CSC_SERVICE ──▶ BleStackPort::register_service
//! ```
//!
//! Everything here is pure data: no I/O, no clocks, no logging.

pub mod advertising;
pub mod codec;
pub mod gatt;
