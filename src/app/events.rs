//! Inbound stack events and outbound application events.
//!
//! [`StackEvent`]s arrive from the BLE stack callback (via the event
//! queue).  [`AppEvent`]s leave the [`CscPeripheral`](super::service::CscPeripheral)
//! through the [`EventSink`](super::ports::EventSink) port; adapters
//! decide what to do with them (serial log, nothing, a test recorder).

use super::ports::{AttrHandle, ConnHandle};
use super::service::PeripheralState;
use crate::csc::codec::Measurement;
use crate::error::StackError;
use crate::sensors::channel::{ChannelId, SensorChannel};

/// Connection lifecycle callbacks from the BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEvent {
    /// A central opened a link.
    CentralConnect { conn: ConnHandle },
    /// A link closed (either side, or supervision timeout).
    CentralDisconnect { conn: ConnHandle },
    /// An indication was acknowledged (or failed) on `conn`.
    IndicateDone {
        conn: ConnHandle,
        handle: AttrHandle,
        status: u8,
    },
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Service registered, feature written, advertising started.
    Started {
        state: PeripheralState,
        payload_len: usize,
    },

    /// The peripheral moved between idle-advertising and connected.
    StateChanged {
        from: PeripheralState,
        to: PeripheralState,
    },

    CentralConnected {
        conn: ConnHandle,
        connections: usize,
    },

    CentralDisconnected {
        conn: ConnHandle,
        connections: usize,
    },

    /// The registry was full; `conn` is not tracked and advertising was
    /// not restarted.
    ConnectionRejected { conn: ConnHandle, capacity: usize },

    /// A revolution was accepted and a measurement encoded.
    MeasurementSent(MeasurementReport),

    /// One recipient of a fan-out could not be notified.
    NotifyFailed { conn: ConnHandle, error: StackError },

    /// The stack refused to restart advertising.
    AdvertisingFailed(StackError),
}

/// What was sent, and to how many centrals.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementReport {
    pub source: ChannelId,
    pub wheel: SensorChannel,
    pub crank: SensorChannel,
    pub bytes: Measurement,
    /// Connections the notify succeeded for.
    pub delivered: usize,
    /// Connections in the registry at send time.
    pub recipients: usize,
}
