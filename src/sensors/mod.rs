//! Rotation sensors: per-channel state, the debounce gate and the ISR
//! entry points.
//!
//! ```text
//!  wheel GPIO ↑ ──▶ wheel_isr_handler(now) ──┐
//!                                            ├──▶ events queue ──▶ main loop
//!  crank GPIO ↑ ──▶ crank_isr_handler(now) ──┘          │
//!                                                       ▼
//!                              Debouncer::accept(&mut SensorChannel, now)
//! ```
//!
//! ISRs only timestamp and enqueue.  Debouncing and counting run on the
//! main loop, which owns both [`SensorChannel`]s, so a channel is never
//! touched from two contexts.

pub mod channel;
pub mod debounce;

use core::sync::atomic::{AtomicU32, Ordering};

use crate::events::{Event, push_event};

pub use channel::{ChannelId, SensorChannel};
pub use debounce::{DebouncePolicy, Debouncer};

/// Triggers lost because the event queue was full.
static DROPPED_TRIGGERS: AtomicU32 = AtomicU32::new(0);

/// Called from the wheel GPIO ISR on each rising edge.
/// Lock-free apart from the queue's critical section; safe in ISR context.
pub fn wheel_isr_handler(now_ms: u32) {
    trigger(ChannelId::Wheel, now_ms);
}

/// Called from the crank GPIO ISR on each rising edge.
pub fn crank_isr_handler(now_ms: u32) {
    trigger(ChannelId::Crank, now_ms);
}

/// Enqueue a raw revolution trigger for `channel`.
pub fn trigger(channel: ChannelId, now_ms: u32) {
    let event = match channel {
        ChannelId::Wheel => Event::WheelRevolution { at_ms: now_ms },
        ChannelId::Crank => Event::CrankRevolution { at_ms: now_ms },
    };
    if !push_event(event) {
        DROPPED_TRIGGERS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Number of triggers dropped on a full queue since boot.
pub fn dropped_triggers() -> u32 {
    DROPPED_TRIGGERS.load(Ordering::Relaxed)
}
