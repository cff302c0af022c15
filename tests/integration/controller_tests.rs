//! Integration tests for the CscPeripheral → BleStackPort pipeline.
//!
//! These run on the host (x86_64) and drive the controller through
//! connects, disconnects and revolutions, asserting on the exact calls the
//! BLE stack receives.

use cheapensor::app::events::{AppEvent, StackEvent};
use cheapensor::app::ports::{AttrHandle, ConnHandle};
use cheapensor::app::service::{CscPeripheral, PeripheralState};
use cheapensor::config::{ConfigError, PeripheralConfig};
use cheapensor::csc::advertising::DEFAULT_ADV_INTERVAL_US;
use cheapensor::error::{Error, StackError};
use cheapensor::registry::MAX_CONNECTIONS;
use cheapensor::sensors::DebouncePolicy;

use crate::mock_stack::{MockStack, RecordingSink, StackCall};

const A: ConnHandle = ConnHandle(1);
const B: ConnHandle = ConnHandle(2);
const FEATURE: AttrHandle = AttrHandle(40);
const MEASUREMENT: AttrHandle = AttrHandle(42);

fn make_csc(config: &PeripheralConfig) -> (CscPeripheral, MockStack, RecordingSink) {
    let mut stack = MockStack::new();
    let mut sink = RecordingSink::default();
    let csc = CscPeripheral::activate(config, &mut stack, &mut sink).expect("activation");
    (csc, stack, sink)
}

fn connect(csc: &mut CscPeripheral, stack: &mut MockStack, sink: &mut RecordingSink, conn: ConnHandle) {
    csc.on_stack_event(StackEvent::CentralConnect { conn }, stack, sink);
}

fn disconnect(csc: &mut CscPeripheral, stack: &mut MockStack, sink: &mut RecordingSink, conn: ConnHandle) {
    csc.on_stack_event(StackEvent::CentralDisconnect { conn }, stack, sink);
}

fn wheel_count(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]])
}

// ── Activation ────────────────────────────────────────────────

#[test]
fn activation_registers_writes_feature_and_advertises() {
    let (csc, stack, sink) = make_csc(&PeripheralConfig::default());

    assert_eq!(
        stack.calls[0],
        StackCall::Register {
            uuid: 0x1816,
            chars: 2
        }
    );
    let writes = stack.writes();
    assert_eq!(writes[0], (FEATURE, vec![0x03, 0x00]));
    assert_eq!(writes[1], (MEASUREMENT, vec![0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    assert_eq!(
        stack.calls.last(),
        Some(&StackCall::Advertise {
            interval_us: DEFAULT_ADV_INTERVAL_US,
            payload: csc.advertising_payload().as_bytes().to_vec(),
        })
    );

    assert_eq!(csc.state(), PeripheralState::IdleAdvertising);
    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::Started {
            state: PeripheralState::IdleAdvertising,
            ..
        }]
    ));
}

#[test]
fn register_failure_aborts_activation() {
    let mut stack = MockStack::new();
    stack.fail_register = Some(StackError::RegisterFailed(-7));
    let result = CscPeripheral::activate(&PeripheralConfig::default(), &mut stack, &mut RecordingSink::default());
    assert!(matches!(result, Err(Error::Stack(StackError::RegisterFailed(-7)))));
    assert!(stack.adverts().is_empty());
}

#[test]
fn advertise_failure_aborts_activation() {
    let mut stack = MockStack::new();
    stack.fail_advertise = Some(StackError::AdvertiseFailed(-2));
    let result = CscPeripheral::activate(&PeripheralConfig::default(), &mut stack, &mut RecordingSink::default());
    assert!(matches!(result, Err(Error::Stack(StackError::AdvertiseFailed(-2)))));
}

#[test]
fn unexpected_handle_count_aborts_activation() {
    let mut stack = MockStack::new();
    stack.handle_count = Some(1);
    let result = CscPeripheral::activate(&PeripheralConfig::default(), &mut stack, &mut RecordingSink::default());
    assert!(matches!(result, Err(Error::Init(_))));
}

#[test]
fn invalid_config_never_reaches_the_stack() {
    let mut config = PeripheralConfig::default();
    config.device_name.clear();
    let mut stack = MockStack::new();
    let result = CscPeripheral::activate(&config, &mut stack, &mut RecordingSink::default());
    assert!(matches!(result, Err(Error::Config(ConfigError::EmptyDeviceName))));
    assert!(stack.calls.is_empty());
}

// ── Fan-out ───────────────────────────────────────────────────

#[test]
fn two_centrals_receive_every_wheel_measurement() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    connect(&mut csc, &mut stack, &mut sink, A);
    connect(&mut csc, &mut stack, &mut sink, B);
    stack.clear();

    assert!(csc.on_wheel_revolution(1000, &mut stack, &mut sink));
    assert!(csc.on_wheel_revolution(1200, &mut stack, &mut sink));

    let notifies = stack.notifies();
    assert_eq!(notifies.len(), 4);
    let mut first: Vec<_> = notifies[..2].iter().map(|(c, _)| *c).collect();
    first.sort_unstable();
    assert_eq!(first, vec![A, B]);

    for (_, bytes) in &notifies[..2] {
        assert_eq!(wheel_count(bytes), 1);
    }
    for (_, bytes) in &notifies[2..] {
        assert_eq!(wheel_count(bytes), 2);
        // Crank fields untouched.
        assert_eq!(&bytes[7..11], &[0, 0, 0, 0]);
    }
    assert_eq!(csc.crank().cumulative_count, 0);
}

#[test]
fn measurement_attribute_tracks_latest_value() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    stack.clear();

    assert!(csc.on_crank_revolution(2000, &mut stack, &mut sink));

    // No centrals: nothing notified, but the readable value is refreshed.
    assert!(stack.notifies().is_empty());
    let writes = stack.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, MEASUREMENT);
    assert_eq!(writes[0].1, csc.measurement().to_vec());
    // crank count 1, crank time 2000 ms -> 2048 ticks
    assert_eq!(&writes[0].1[7..11], &[0x01, 0x00, 0x00, 0x08]);
}

#[test]
fn notify_failure_does_not_block_other_centrals() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    connect(&mut csc, &mut stack, &mut sink, A);
    connect(&mut csc, &mut stack, &mut sink, B);
    stack.failing_conns.push(A);
    stack.clear();
    sink.events.clear();

    assert!(csc.on_wheel_revolution(1000, &mut stack, &mut sink));

    let notifies = stack.notifies();
    assert_eq!(notifies.len(), 1);
    assert_eq!(notifies[0].0, B);
    assert_eq!(csc.stats().notify_failures, 1);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::NotifyFailed { conn, .. } if *conn == A
    )));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::MeasurementSent(r) if r.delivered == 1 && r.recipients == 2
    )));
}

// ── Debounce through the controller ───────────────────────────

#[test]
fn bounce_within_window_is_not_sent() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    connect(&mut csc, &mut stack, &mut sink, A);
    stack.clear();

    assert!(csc.on_wheel_revolution(1000, &mut stack, &mut sink));
    assert!(!csc.on_wheel_revolution(1167, &mut stack, &mut sink));
    assert!(csc.on_wheel_revolution(1168, &mut stack, &mut sink));

    assert_eq!(stack.notifies().len(), 2);
    assert_eq!(csc.wheel().cumulative_count, 2);
    assert_eq!(csc.wheel().last_event_time_ms, 1168);
    assert_eq!(csc.stats().rejected, 1);
}

#[test]
fn always_accept_counts_every_trigger() {
    let config = PeripheralConfig {
        debounce: DebouncePolicy::AlwaysAccept,
        ..PeripheralConfig::default()
    };
    let (mut csc, mut stack, mut sink) = make_csc(&config);

    for t in [0, 0, 5, 10] {
        assert!(csc.on_wheel_revolution(t, &mut stack, &mut sink));
    }
    assert_eq!(csc.wheel().cumulative_count, 4);
    assert_eq!(csc.stats().wheel_accepted, 4);
}

// ── Connection lifecycle ──────────────────────────────────────

#[test]
fn last_disconnect_returns_to_idle_and_readvertises_same_payload() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    let initial = stack.adverts()[0].clone();

    connect(&mut csc, &mut stack, &mut sink, A);
    connect(&mut csc, &mut stack, &mut sink, B);
    assert_eq!(csc.state(), PeripheralState::Connected);

    disconnect(&mut csc, &mut stack, &mut sink, A);
    assert_eq!(csc.state(), PeripheralState::Connected);
    assert_eq!(csc.connections().as_slice(), &[B]);

    stack.clear();
    disconnect(&mut csc, &mut stack, &mut sink, B);
    assert_eq!(csc.state(), PeripheralState::IdleAdvertising);
    assert!(csc.connections().is_empty());
    assert_eq!(stack.adverts(), vec![initial]);

    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::StateChanged {
            from: PeripheralState::Connected,
            to: PeripheralState::IdleAdvertising
        }
    )));
}

#[test]
fn every_connect_restarts_advertising() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    stack.clear();
    connect(&mut csc, &mut stack, &mut sink, A);
    connect(&mut csc, &mut stack, &mut sink, B);
    assert_eq!(stack.adverts().len(), 2);
}

#[test]
fn unknown_disconnect_is_a_no_op() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    connect(&mut csc, &mut stack, &mut sink, A);
    stack.clear();
    sink.events.clear();

    disconnect(&mut csc, &mut stack, &mut sink, ConnHandle(99));

    assert!(stack.calls.is_empty());
    assert!(sink.events.is_empty());
    assert_eq!(csc.state(), PeripheralState::Connected);
    assert_eq!(csc.connections().as_slice(), &[A]);
}

#[test]
fn controller_link_limit_centrals_all_receive_measurements() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    // Bluedroid's maximum number of simultaneous links.
    for i in 0..9u16 {
        connect(&mut csc, &mut stack, &mut sink, ConnHandle(i));
    }
    stack.clear();

    csc.on_wheel_revolution(1000, &mut stack, &mut sink);

    let mut notified: Vec<u16> = stack.notifies().iter().map(|(c, _)| c.0).collect();
    notified.sort_unstable();
    assert_eq!(notified, (0..9u16).collect::<Vec<_>>());
}

#[test]
fn full_registry_rejects_connect_without_readvertising() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    for i in 0..MAX_CONNECTIONS as u16 {
        connect(&mut csc, &mut stack, &mut sink, ConnHandle(i));
    }
    stack.clear();
    sink.events.clear();

    let extra = ConnHandle(500);
    connect(&mut csc, &mut stack, &mut sink, extra);

    assert!(stack.adverts().is_empty());
    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::ConnectionRejected { conn, capacity }]
            if *conn == extra && *capacity == MAX_CONNECTIONS
    ));
    assert_eq!(csc.connections().len(), MAX_CONNECTIONS);
    assert!(!csc.connections().contains(&extra));

    // Freeing a slot resumes advertising and the next connect is tracked.
    disconnect(&mut csc, &mut stack, &mut sink, ConnHandle(0));
    assert_eq!(stack.adverts().len(), 1);
    connect(&mut csc, &mut stack, &mut sink, extra);
    assert!(csc.connections().contains(&extra));
}

#[test]
fn advertising_restart_failure_is_reported_not_fatal() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    stack.fail_advertise = Some(StackError::AdvertiseFailed(-5));

    connect(&mut csc, &mut stack, &mut sink, A);

    assert_eq!(csc.state(), PeripheralState::Connected);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AdvertisingFailed(StackError::AdvertiseFailed(-5))
    )));
}

#[test]
fn indicate_done_changes_nothing() {
    let (mut csc, mut stack, mut sink) = make_csc(&PeripheralConfig::default());
    connect(&mut csc, &mut stack, &mut sink, A);
    stack.clear();
    sink.events.clear();

    csc.on_stack_event(
        StackEvent::IndicateDone {
            conn: A,
            handle: MEASUREMENT,
            status: 0,
        },
        &mut stack,
        &mut sink,
    );

    assert!(stack.calls.is_empty());
    assert!(sink.events.is_empty());
    assert_eq!(csc.state(), PeripheralState::Connected);
}
