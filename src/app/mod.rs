//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the CSC peripheral: connection
//! tracking, revolution acceptance and measurement fan-out.  All
//! interaction with the radio happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real hardware.

pub mod events;
pub mod ports;
pub mod service;
