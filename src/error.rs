//! Unified error types for the Cheapensor firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! activation path's error handling uniform.  All variants are `Copy` so
//! they can be passed around the event loop without allocation.
//!
//! Only start-up failures are ever propagated.  Runtime delivery problems
//! (a notify to a stale connection, an advertising restart the stack
//! refused) are logged where they happen and never reach the caller.

use core::fmt;

pub use crate::config::ConfigError;
pub use crate::csc::advertising::AdvertisingError;
pub use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible start-up operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The BLE stack rejected an operation.
    Stack(StackError),
    /// The advertising payload could not be built.
    Advertising(AdvertisingError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// GPIO / timer peripheral set-up failed.
    Hardware(HwInitError),
    /// The stack returned something structurally unexpected.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(e) => write!(f, "stack: {e}"),
            Self::Advertising(e) => write!(f, "advertising: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// BLE stack errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`BleStackPort`](crate::app::ports::BleStackPort)
/// implementation.  The `i32` payloads carry the vendor return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Controller / host bring-up failed.
    InitFailed(i32),
    /// The GATT service could not be registered.
    RegisterFailed(i32),
    /// Writing a local attribute value failed.
    WriteFailed(i32),
    /// A notification could not be queued for a connection.
    NotifyFailed(i32),
    /// Advertising could not be (re)started.
    AdvertiseFailed(i32),
    /// The stack did not answer within the start-up deadline.
    Timeout,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(rc) => write!(f, "BLE init failed (rc={rc})"),
            Self::RegisterFailed(rc) => write!(f, "service registration failed (rc={rc})"),
            Self::WriteFailed(rc) => write!(f, "attribute write failed (rc={rc})"),
            Self::NotifyFailed(rc) => write!(f, "notify failed (rc={rc})"),
            Self::AdvertiseFailed(rc) => write!(f, "advertising failed (rc={rc})"),
            Self::Timeout => write!(f, "stack timed out"),
        }
    }
}

impl std::error::Error for StackError {}

impl From<StackError> for Error {
    fn from(e: StackError) -> Self {
        Self::Stack(e)
    }
}

impl From<AdvertisingError> for Error {
    fn from(e: AdvertisingError) -> Self {
        Self::Advertising(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
