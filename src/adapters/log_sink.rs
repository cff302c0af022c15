//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! With `debug_measurements` on, every send also prints both counters and
//! the raw measurement bytes.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink {
    debug_measurements: bool,
}

impl LogEventSink {
    pub fn new(debug_measurements: bool) -> Self {
        Self { debug_measurements }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { state, payload_len } => {
                info!("START | state={:?} | adv_payload={}B", state, payload_len);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::CentralConnected { conn, connections } => {
                info!("CONN  | +{} | links={}", conn.0, connections);
            }
            AppEvent::CentralDisconnected { conn, connections } => {
                info!("CONN  | -{} | links={}", conn.0, connections);
            }
            AppEvent::MeasurementSent(report) => {
                if self.debug_measurements {
                    info!(
                        "CSC   | {:?} | wheel={} @{}ms crank={} @{}ms | sent {}/{} | {:02x?}",
                        report.source,
                        report.wheel.cumulative_count,
                        report.wheel.last_event_time_ms,
                        report.crank.cumulative_count,
                        report.crank.last_event_time_ms,
                        report.delivered,
                        report.recipients,
                        report.bytes,
                    );
                } else {
                    debug!(
                        "CSC   | {:?} | sent {}/{}",
                        report.source, report.delivered, report.recipients
                    );
                }
            }
            AppEvent::ConnectionRejected { conn, capacity } => {
                warn!("CONN  | !{} | registry full ({} links)", conn.0, capacity);
            }
            AppEvent::NotifyFailed { conn, error } => {
                warn!("CSC   | notify conn={} failed: {}", conn.0, error);
            }
            AppEvent::AdvertisingFailed(error) => {
                warn!("ADV   | restart failed: {}", error);
            }
        }
    }
}
