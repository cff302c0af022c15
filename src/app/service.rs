//! The CSC peripheral controller, the hexagonal core.
//!
//! [`CscPeripheral`] owns both sensor channels, the debouncer, the
//! connection registry and the advertising payload.  It is hardware
//! agnostic: the BLE stack and the event sink are injected at each call
//! site, so the whole peripheral runs against mock adapters on the host.
//!
//! ```text
//!  events::Event ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                    │       CscPeripheral      │
//!  BleStackPort  ◀── │ debounce · registry · enc│
//!                    └──────────────────────────┘
//! ```
//!
//! | From            | Event                     | To              |
//! |-----------------|---------------------------|-----------------|
//! | IdleAdvertising | central connects          | Connected       |
//! | Connected       | another central connects  | Connected       |
//! | Connected       | last central disconnects  | IdleAdvertising |
//! | Connected       | a central disconnects     | Connected       |
//!
//! Advertising is restarted after every connect and disconnect, so the
//! sensor stays discoverable while links are open.

use log::{debug, info, warn};

use crate::config::PeripheralConfig;
use crate::csc::advertising::AdvertisingPayload;
use crate::csc::codec::{self, Measurement};
use crate::csc::gatt::{APPEARANCE_CYCLING_SPEED_CADENCE, CSC_SERVICE, CSC_SERVICE_UUID};
use crate::error::{Error, Result};
use crate::events::Event;
use crate::registry::{ConnectionRegistry, ConnectionSnapshot, MAX_CONNECTIONS};
use crate::sensors::{ChannelId, Debouncer, SensorChannel};

use super::events::{AppEvent, MeasurementReport, StackEvent};
use super::ports::{AttrHandle, BleStackPort, ConnHandle, EventSink};

// ───────────────────────────────────────────────────────────────
// State and bookkeeping
// ───────────────────────────────────────────────────────────────

/// Connection-level state of the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    /// No central connected; advertising.
    IdleAdvertising,
    /// At least one central connected (advertising continues).
    Connected,
}

/// Value handles of the registered CSC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CscHandles {
    pub feature: AttrHandle,
    pub measurement: AttrHandle,
}

/// Counters since activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeripheralStats {
    pub wheel_accepted: u32,
    pub crank_accepted: u32,
    /// Triggers refused by the debouncer (both channels).
    pub rejected: u32,
    /// Per-connection notify failures.
    pub notify_failures: u32,
}

// ───────────────────────────────────────────────────────────────
// CscPeripheral
// ───────────────────────────────────────────────────────────────

pub struct CscPeripheral {
    state: PeripheralState,
    wheel: SensorChannel,
    crank: SensorChannel,
    debouncer: Debouncer,
    registry: ConnectionRegistry,
    payload: AdvertisingPayload,
    adv_interval_us: u32,
    handles: Option<CscHandles>,
    stats: PeripheralStats,
}

impl CscPeripheral {
    /// Build the peripheral from configuration.
    ///
    /// Does **not** touch the radio. Use [`activate`](Self::activate) for
    /// the full bring-up.
    pub fn new(config: &PeripheralConfig) -> Result<Self> {
        config.validate()?;
        let payload = AdvertisingPayload::build(
            &config.device_name,
            CSC_SERVICE_UUID,
            APPEARANCE_CYCLING_SPEED_CADENCE,
        )?;

        Ok(Self {
            state: PeripheralState::IdleAdvertising,
            wheel: SensorChannel::new(),
            crank: SensorChannel::new(),
            debouncer: Debouncer::new(config.debounce),
            registry: ConnectionRegistry::new(),
            payload,
            adv_interval_us: config.adv_interval_us,
            handles: None,
            stats: PeripheralStats::default(),
        })
    }

    /// Register the CSC service, publish the feature value and start
    /// advertising.  Any stack failure aborts activation.
    pub fn activate(
        config: &PeripheralConfig,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) -> Result<Self> {
        let mut this = Self::new(config)?;

        let registered = stack.register_service(&CSC_SERVICE)?;
        let (feature, measurement) = match registered.as_slice() {
            [feature, measurement] => (*feature, *measurement),
            _ => return Err(Error::Init("unexpected CSC attribute count")),
        };
        this.handles = Some(CscHandles {
            feature,
            measurement,
        });

        stack.write_attribute(feature, &codec::feature_value())?;
        stack.write_attribute(measurement, &this.measurement())?;
        stack.start_advertising(this.adv_interval_us, this.payload.as_bytes())?;

        info!(
            "CSC: service up (feature={}, measurement={}), advertising {} bytes every {} us",
            feature.0,
            measurement.0,
            this.payload.len(),
            this.adv_interval_us
        );
        sink.emit(&AppEvent::Started {
            state: this.state,
            payload_len: this.payload.len(),
        });
        Ok(this)
    }

    // ── Event dispatch ────────────────────────────────────────

    /// Process one event taken from the queue.
    pub fn handle_event(
        &mut self,
        event: Event,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            Event::WheelRevolution { at_ms } => {
                self.on_wheel_revolution(at_ms, stack, sink);
            }
            Event::CrankRevolution { at_ms } => {
                self.on_crank_revolution(at_ms, stack, sink);
            }
            Event::Stack(ev) => self.on_stack_event(ev, stack, sink),
        }
    }

    /// React to a connection lifecycle callback.
    pub fn on_stack_event(
        &mut self,
        event: StackEvent,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            StackEvent::CentralConnect { conn } => self.on_connect(conn, stack, sink),
            StackEvent::CentralDisconnect { conn } => self.on_disconnect(conn, stack, sink),
            StackEvent::IndicateDone {
                conn,
                handle,
                status,
            } => {
                debug!(
                    "CSC: indicate done conn={} handle={} status={}",
                    conn.0, handle.0, status
                );
            }
        }
    }

    /// Wheel trigger at `now_ms`.  Returns whether it counted.
    pub fn on_wheel_revolution(
        &mut self,
        now_ms: u32,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) -> bool {
        self.on_revolution(ChannelId::Wheel, now_ms, stack, sink)
    }

    /// Crank trigger at `now_ms`.  Returns whether it counted.
    pub fn on_crank_revolution(
        &mut self,
        now_ms: u32,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) -> bool {
        self.on_revolution(ChannelId::Crank, now_ms, stack, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn wheel(&self) -> &SensorChannel {
        &self.wheel
    }

    pub fn crank(&self) -> &SensorChannel {
        &self.crank
    }

    /// Connected centrals at this instant.
    pub fn connections(&self) -> ConnectionSnapshot {
        self.registry.snapshot()
    }

    pub fn advertising_payload(&self) -> &AdvertisingPayload {
        &self.payload
    }

    /// `None` until [`activate`](Self::activate) has registered the service.
    pub fn handles(&self) -> Option<CscHandles> {
        self.handles
    }

    /// The measurement as it would be encoded now.
    pub fn measurement(&self) -> Measurement {
        codec::encode(&self.wheel, &self.crank)
    }

    pub fn stats(&self) -> PeripheralStats {
        self.stats
    }

    // ── Internals ─────────────────────────────────────────────

    fn on_connect(&mut self, conn: ConnHandle, stack: &mut impl BleStackPort, sink: &mut impl EventSink) {
        if !self.registry.on_connect(conn) {
            // No restart: a further central could not be served either.
            sink.emit(&AppEvent::ConnectionRejected {
                conn,
                capacity: MAX_CONNECTIONS,
            });
            return;
        }
        info!(
            "CSC: central {} connected ({} link(s))",
            conn.0,
            self.registry.len()
        );
        sink.emit(&AppEvent::CentralConnected {
            conn,
            connections: self.registry.len(),
        });
        self.transition(PeripheralState::Connected, sink);
        self.restart_advertising(stack, sink);
    }

    fn on_disconnect(&mut self, conn: ConnHandle, stack: &mut impl BleStackPort, sink: &mut impl EventSink) {
        if !self.registry.on_disconnect(conn) {
            debug!("CSC: disconnect for unknown conn {}", conn.0);
            return;
        }
        info!(
            "CSC: central {} disconnected ({} link(s) left)",
            conn.0,
            self.registry.len()
        );
        sink.emit(&AppEvent::CentralDisconnected {
            conn,
            connections: self.registry.len(),
        });
        if self.registry.is_empty() {
            self.transition(PeripheralState::IdleAdvertising, sink);
        }
        self.restart_advertising(stack, sink);
    }

    fn transition(&mut self, to: PeripheralState, sink: &mut impl EventSink) {
        let from = self.state;
        if from != to {
            self.state = to;
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }

    fn restart_advertising(&mut self, stack: &mut impl BleStackPort, sink: &mut impl EventSink) {
        if let Err(e) = stack.start_advertising(self.adv_interval_us, self.payload.as_bytes()) {
            warn!("CSC: advertising restart failed: {}", e);
            sink.emit(&AppEvent::AdvertisingFailed(e));
        }
    }

    fn on_revolution(
        &mut self,
        source: ChannelId,
        now_ms: u32,
        stack: &mut impl BleStackPort,
        sink: &mut impl EventSink,
    ) -> bool {
        let channel = match source {
            ChannelId::Wheel => &mut self.wheel,
            ChannelId::Crank => &mut self.crank,
        };
        if !self.debouncer.accept(channel, now_ms) {
            self.stats.rejected = self.stats.rejected.wrapping_add(1);
            return false;
        }
        match source {
            ChannelId::Wheel => self.stats.wheel_accepted = self.stats.wheel_accepted.wrapping_add(1),
            ChannelId::Crank => self.stats.crank_accepted = self.stats.crank_accepted.wrapping_add(1),
        }
        self.send_measurement(source, stack, sink);
        true
    }

    /// Encode both channels, refresh the attribute value and notify every
    /// connection in a snapshot of the registry.
    fn send_measurement(&mut self, source: ChannelId, stack: &mut impl BleStackPort, sink: &mut impl EventSink) {
        let bytes = self.measurement();
        let Some(handles) = self.handles else {
            debug!("CSC: {:?} revolution before activation, not sent", source);
            return;
        };

        if let Err(e) = stack.write_attribute(handles.measurement, &bytes) {
            warn!("CSC: measurement attribute write failed: {}", e);
        }

        let recipients = self.registry.snapshot();
        let mut delivered = 0;
        for &conn in &recipients {
            match stack.notify(conn, handles.measurement, &bytes) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    self.stats.notify_failures = self.stats.notify_failures.wrapping_add(1);
                    warn!("CSC: notify to conn {} failed: {}", conn.0, error);
                    sink.emit(&AppEvent::NotifyFailed { conn, error });
                }
            }
        }

        sink.emit(&AppEvent::MeasurementSent(MeasurementReport {
            source,
            wheel: self.wheel,
            crank: self.crank,
            bytes,
            delivered,
            recipients: recipients.len(),
        }));
    }
}
