//! Interrupt-driven event queue.
//!
//! Events are produced by:
//! - GPIO ISRs (wheel / crank revolution triggers, timestamped at the edge)
//! - BLE stack callbacks (connect, disconnect, indicate-done)
//! - The simulation timer (demo revolutions)
//!
//! Events are consumed by the main loop, one at a time, in FIFO order.
//! The main loop is the only context that mutates the peripheral state.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│              │     │              │
//! │ BLE callback│────▶│  Event Queue │────▶│  Main Loop   │
//! │ Sim timer   │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::events::StackEvent;

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 32;

/// Everything the main loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Raw wheel sensor edge, not yet debounced.
    WheelRevolution { at_ms: u32 },
    /// Raw crank sensor edge, not yet debounced.
    CrankRevolution { at_ms: u32 },
    /// Connection lifecycle callback from the BLE stack.
    Stack(StackEvent),
}

// Multi-producer (ISRs, BLE task, timer task), single consumer (main loop).
static EVENT_QUEUE: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP> = Channel::new();

/// Push an event into the queue.
/// Safe to call from ISR context (never blocks).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    EVENT_QUEUE.try_send(event).is_ok()
}

/// Pop the next event from the queue.
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    EVENT_QUEUE.try_receive().ok()
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    EVENT_QUEUE.is_empty()
}

/// Number of pending events.
pub fn queue_len() -> usize {
    EVENT_QUEUE.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ConnHandle;

    // The queue is a process-wide static, so everything that touches it
    // lives in this single test.
    #[test]
    fn fifo_order_and_overflow() {
        drain_events(|_| {});
        assert!(queue_is_empty());

        assert!(push_event(Event::WheelRevolution { at_ms: 1 }));
        assert!(push_event(Event::Stack(StackEvent::CentralConnect {
            conn: ConnHandle(3)
        })));
        assert!(push_event(Event::CrankRevolution { at_ms: 2 }));
        assert_eq!(queue_len(), 3);

        let mut seen = Vec::new();
        drain_events(|e| seen.push(e));
        assert_eq!(
            seen,
            vec![
                Event::WheelRevolution { at_ms: 1 },
                Event::Stack(StackEvent::CentralConnect { conn: ConnHandle(3) }),
                Event::CrankRevolution { at_ms: 2 },
            ]
        );

        for i in 0..EVENT_QUEUE_CAP as u32 {
            assert!(push_event(Event::WheelRevolution { at_ms: i }));
        }
        assert!(!push_event(Event::WheelRevolution { at_ms: 999 }));
        assert_eq!(pop_event(), Some(Event::WheelRevolution { at_ms: 0 }));
        drain_events(|_| {});
        assert_eq!(pop_event(), None);
    }
}
