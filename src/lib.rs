//! Cheapensor firmware library.
//!
//! A Bluetooth LE Cycling Speed and Cadence sensor: two magnet switches
//! in, CSC measurement notifications out.  Exposes the pure-logic modules
//! for integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod csc;
pub mod error;
pub mod events;
pub mod registry;
pub mod sensors;

// The ESP-IDF implementations inside are cfg-guarded; host builds get
// simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod pins;
