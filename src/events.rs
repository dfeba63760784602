//! Interrupt/timer-driven wake-up events for the control loop.
//!
//! Events are produced by:
//! - the button poll timer (esp_timer task)
//! - the protocol server task (remote writes, server ready)
//! - background job threads (job finished)
//!
//! and consumed by the main control loop. Events are level-like: pushing
//! an event that is already pending coalesces with it, so the queue is a
//! set of pending flags rather than a FIFO. Draining hands them out in
//! priority order (lower discriminant first).
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ Poll timer   │────▶│ Pending set   │     │              │
//! │ Protocol task│────▶│ (AtomicU8,    │────▶│  Main Loop   │
//! │ Job threads  │────▶│  lock-free)   │     │  (consumer)  │
//! └──────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! Payloads (the written characteristic and value) travel separately over
//! the bounded channel in [`adapters::protocol`](crate::adapters::protocol);
//! the event only wakes the loop.

use core::sync::atomic::{AtomicU8, Ordering};

/// Wake-up reasons, ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Button poll timer fired.
    ButtonPollTick = 0,
    /// One or more remote writes are queued.
    RemoteWrite = 1,
    /// The protocol server finished starting.
    ProtocolReady = 2,
    /// A background job ended; outputs must be redriven from the state.
    JobFinished = 3,
}

impl Event {
    const ALL: [Event; 4] = [
        Event::ButtonPollTick,
        Event::RemoteWrite,
        Event::ProtocolReady,
        Event::JobFinished,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

// Any task may produce (fetch_or); only the main loop consumes (swap).
static PENDING: AtomicU8 = AtomicU8::new(0);

/// Mark an event pending. Safe from timer callbacks and other tasks.
/// Returns `false` if it was already pending (coalesced).
pub fn push_event(event: Event) -> bool {
    PENDING.fetch_or(event.bit(), Ordering::AcqRel) & event.bit() == 0
}

/// Take every pending event and hand them to `handler` in priority order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    let pending = PENDING.swap(0, Ordering::AcqRel);
    for event in Event::ALL {
        if pending & event.bit() != 0 {
            handler(event);
        }
    }
}

/// Check if no event is pending.
pub fn queue_is_empty() -> bool {
    PENDING.load(Ordering::Acquire) == 0
}
