//! Cheapensor firmware entry point.
//!
//! Hexagonal architecture with interrupt-driven event execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleAdapter        LogEventSink      EspClock                  │
//! │  (BleStackPort)    (EventSink)       (ClockPort)               │
//! │  hw_init ISRs      sim_timer                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              CscPeripheral (pure logic)                │    │
//! │  │  Debounce · Registry · Measurement codec               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// Linked for its critical-section implementation (event queue).
use esp_idf_hal as _;

use anyhow::Result;
use log::{info, warn};

use cheapensor::adapters::ble::BleAdapter;
use cheapensor::adapters::log_sink::LogEventSink;
use cheapensor::adapters::time::EspClock;
use cheapensor::app::ports::ClockPort;
use cheapensor::app::service::CscPeripheral;
use cheapensor::config::{PeripheralConfig, SensorSource};
use cheapensor::{drivers, events, sensors};

/// Idle time between queue drains.
const LOOP_SLEEP_MS: u64 = 5;

/// Period of the status line in the log.
const STATUS_INTERVAL_MS: u32 = 30_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Cheapensor v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = PeripheralConfig::default();
    config.validate()?;
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config: could not serialise ({})", e),
    }

    // ── 3. BLE stack + CSC service ────────────────────────────
    let mut ble = BleAdapter::new(config.device_name.clone());
    ble.init()?;
    let mut sink = LogEventSink::new(config.debug_measurements);
    let mut csc = CscPeripheral::activate(&config, &mut ble, &mut sink)?;

    // ── 4. Revolution source ──────────────────────────────────
    match config.sensor_source {
        SensorSource::Gpio => {
            drivers::hw_init::init_sensor_inputs()?;
            drivers::hw_init::init_isr_service()?;
        }
        SensorSource::Simulated { period_ms } => {
            drivers::sim_timer::start(period_ms)?;
        }
    }

    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    let clock = EspClock::new();
    let mut last_status_ms = clock.now_ms();
    let mut dropped_seen = 0;
    loop {
        events::drain_events(|event| csc.handle_event(event, &mut ble, &mut sink));

        let dropped = sensors::dropped_triggers();
        if dropped != dropped_seen {
            warn!(
                "Event queue overflow: {} trigger(s) dropped",
                dropped.wrapping_sub(dropped_seen)
            );
            dropped_seen = dropped;
        }

        let now = clock.now_ms();
        if now.wrapping_sub(last_status_ms) >= STATUS_INTERVAL_MS {
            let stats = csc.stats();
            info!(
                "Status: {:?}, {} central(s), wheel={} crank={} rejected={} notify_failures={}",
                csc.state(),
                csc.connections().len(),
                stats.wheel_accepted,
                stats.crank_accepted,
                stats.rejected,
                stats.notify_failures
            );
            last_status_ms = now;
        }

        std::thread::sleep(std::time::Duration::from_millis(LOOP_SLEEP_MS));
    }
}
