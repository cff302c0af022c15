//! Mock BLE stack and event sink for integration tests.
//!
//! Records every stack call so tests can assert on the full history
//! without touching a radio.

use cheapensor::app::events::AppEvent;
use cheapensor::app::ports::{AttrHandle, AttrHandles, BleStackPort, ConnHandle, EventSink};
use cheapensor::csc::gatt::ServiceDescriptor;
use cheapensor::error::StackError;

// ── Stack call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StackCall {
    Register { uuid: u16, chars: usize },
    Write { handle: AttrHandle, value: Vec<u8> },
    Notify { conn: ConnHandle, handle: AttrHandle, value: Vec<u8> },
    Advertise { interval_us: u32, payload: Vec<u8> },
}

// ── MockStack ─────────────────────────────────────────────────

pub struct MockStack {
    pub calls: Vec<StackCall>,
    /// Connections whose notify fails.
    pub failing_conns: Vec<ConnHandle>,
    pub fail_register: Option<StackError>,
    pub fail_advertise: Option<StackError>,
    /// Override the number of handles `register_service` returns.
    pub handle_count: Option<usize>,
}

#[allow(dead_code)]
impl MockStack {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            failing_conns: Vec::new(),
            fail_register: None,
            fail_advertise: None,
            handle_count: None,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn notifies(&self) -> Vec<(ConnHandle, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StackCall::Notify { conn, value, .. } => Some((*conn, value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn adverts(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StackCall::Advertise { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(AttrHandle, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StackCall::Write { handle, value } => Some((*handle, value.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BleStackPort for MockStack {
    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<AttrHandles, StackError> {
        if let Some(e) = self.fail_register {
            return Err(e);
        }
        self.calls.push(StackCall::Register {
            uuid: service.uuid,
            chars: service.characteristics.len(),
        });
        let n = self.handle_count.unwrap_or(service.characteristics.len());
        Ok((0..n as u16).map(|i| AttrHandle(40 + 2 * i)).collect())
    }

    fn write_attribute(&mut self, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        self.calls.push(StackCall::Write {
            handle,
            value: value.to_vec(),
        });
        Ok(())
    }

    fn notify(&mut self, conn: ConnHandle, handle: AttrHandle, value: &[u8]) -> Result<(), StackError> {
        if self.failing_conns.contains(&conn) {
            return Err(StackError::NotifyFailed(-1));
        }
        self.calls.push(StackCall::Notify {
            conn,
            handle,
            value: value.to_vec(),
        });
        Ok(())
    }

    fn start_advertising(&mut self, interval_us: u32, payload: &[u8]) -> Result<(), StackError> {
        if let Some(e) = self.fail_advertise {
            return Err(e);
        }
        self.calls.push(StackCall::Advertise {
            interval_us,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
