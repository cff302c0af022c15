//! End-to-end flow through the static event queue: ISR entry points and
//! stack callbacks enqueue, the main loop drains into the controller.
//!
//! The queue is process-wide, so this file holds a single test.

use cheapensor::adapters::ble::forward_stack_event;
use cheapensor::app::events::StackEvent;
use cheapensor::app::ports::{AttrHandle, ConnHandle};
use cheapensor::app::service::{CscPeripheral, PeripheralState};
use cheapensor::config::PeripheralConfig;
use cheapensor::drivers::sim_timer::fire_simulated_revolution;
use cheapensor::events::{self, Event};
use cheapensor::sensors;

use crate::mock_stack::{MockStack, RecordingSink};

#[test]
fn isr_triggers_reach_connected_central_in_order() {
    let mut stack = MockStack::new();
    let mut sink = RecordingSink::default();
    let mut csc = CscPeripheral::activate(&PeripheralConfig::default(), &mut stack, &mut sink)
        .expect("activation");
    events::drain_events(|_| {});
    stack.clear();

    assert!(forward_stack_event(StackEvent::CentralConnect {
        conn: ConnHandle(3)
    }));
    sensors::wheel_isr_handler(1000);
    sensors::wheel_isr_handler(1050); // bounce
    sensors::crank_isr_handler(1100);
    fire_simulated_revolution(2500);

    events::drain_events(|event| csc.handle_event(event, &mut stack, &mut sink));

    assert!(events::queue_is_empty());
    assert_eq!(csc.state(), PeripheralState::Connected);
    assert_eq!(csc.wheel().cumulative_count, 2);
    assert_eq!(csc.crank().cumulative_count, 2);
    assert_eq!(csc.stats().rejected, 1);
    // wheel@1000, crank@1100, wheel@2500, crank@2500
    assert_eq!(stack.notifies().len(), 4);
    assert_eq!(sensors::dropped_triggers(), 0);

    // A saturated queue refuses stack callbacks too, indicate-done included.
    while events::push_event(Event::WheelRevolution { at_ms: 0 }) {}
    assert!(!forward_stack_event(StackEvent::IndicateDone {
        conn: ConnHandle(3),
        handle: AttrHandle(42),
        status: 0,
    }));
    events::drain_events(|_| {});
    assert!(events::queue_is_empty());
}
