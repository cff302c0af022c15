//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CscPeripheral (domain)
//! ```
//!
//! Driven adapters (BLE stack, clock, event sinks) implement these traits.
//! The [`CscPeripheral`](super::service::CscPeripheral) consumes them via
//! generics, so the domain core never touches the radio directly.

use crate::csc::gatt::{MAX_CHARACTERISTICS, ServiceDescriptor};
use crate::error::StackError;

// ───────────────────────────────────────────────────────────────
// Handles
// ───────────────────────────────────────────────────────────────

/// Opaque per-link identifier assigned by the BLE stack on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnHandle(pub u16);

/// Handle of a local GATT attribute (characteristic value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrHandle(pub u16);

/// Attribute handles returned by service registration, one per
/// characteristic in declaration order.
pub type AttrHandles = heapless::Vec<AttrHandle, MAX_CHARACTERISTICS>;

// ───────────────────────────────────────────────────────────────
// BLE stack port (driven adapter: domain ↔ GATT server / advertiser)
// ───────────────────────────────────────────────────────────────

/// What the domain needs from a BLE peripheral stack.
///
/// Connection events flow the other way, as
/// [`StackEvent`](super::events::StackEvent)s through the event queue.
pub trait BleStackPort {
    /// Register a primary service and return its value handles.
    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError>;

    /// Set the local value of an attribute (served to reads).
    fn write_attribute(&mut self, handle: AttrHandle, value: &[u8]) -> Result<(), StackError>;

    /// Send a notification to one connection.  May fail for a link that
    /// dropped while the notification was in flight.
    fn notify(&mut self, conn: ConnHandle, handle: AttrHandle, value: &[u8]) -> Result<(), StackError>;

    /// (Re)start connectable advertising with `payload` every `interval_us`.
    fn start_advertising(&mut self, interval_us: u32, payload: &[u8]) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: platform timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Wraps at `u32::MAX` (~49.7 days); every
/// consumer compares timestamps with `wrapping_sub`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}
