//! Deadline engine for the control loop.
//!
//! Two kinds of deadline live here, both driven by the loop's millisecond
//! clock rather than by their own timers:
//!
//! * [`SaveScheduler`] coalesces state changes into delayed flash writes,
//!   one pending slot per persisted [`Field`].
//! * [`PeriodicDeadline`] fires at a fixed interval (WiFi health check).
//!
//! ```text
//!  set_state ──▶ schedule_save(field, v) ──┐  re-arm overwrites value
//!                                          ▼  and restarts the delay
//!                                  ┌──────────────┐
//!  control loop tick(now) ───────▶ │ per-field    │── delay elapsed ──▶ SaveDelegate
//!                                  │ PendingSave  │                     (NVS write)
//!                                  └──────────────┘
//! ```
//!
//! The scheduler is decoupled from storage: when a slot expires it calls the
//! [`SaveDelegate`] and reports the outcome. Failed writes are not retried;
//! the next change to the field arms a fresh save.

use heapless::Vec;
use log::{debug, info, warn};

use crate::app::characteristics::{Field, Value};
use crate::app::ports::{SaveDelegate, StorageError};

// ═══════════════════════════════════════════════════════════════
//  Debounced persistence
// ═══════════════════════════════════════════════════════════════

/// A not-yet-written value and the time it was (re-)armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSave {
    pub value: Value,
    pub armed_at_ms: u32,
}

/// Result of one expired slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub field: Field,
    pub value: Value,
    pub result: Result<(), StorageError>,
}

/// Per-field single-shot save deadlines.
pub struct SaveScheduler {
    delay_ms: u32,
    slots: [Option<PendingSave>; Field::COUNT],
    /// Set once a factory reset is under way; nothing may be armed again.
    frozen: bool,
}

impl SaveScheduler {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            slots: [None; Field::COUNT],
            frozen: false,
        }
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Arm (or re-arm) the save for `field`. Re-arming restarts the delay
    /// and replaces the pending value. Returns `true` if a previous pending
    /// save was superseded.
    /// Ignored while [frozen](Self::freeze).
    pub fn schedule_save(&mut self, field: Field, value: Value, now_ms: u32) -> bool {
        if self.frozen {
            debug!("Saver: {} not armed, saves frozen", field.key());
            return false;
        }
        let slot = &mut self.slots[field.index()];
        let superseded = slot.is_some();
        *slot = Some(PendingSave {
            value,
            armed_at_ms: now_ms,
        });
        superseded
    }

    /// Drop a pending save without writing it.
    pub fn cancel(&mut self, field: Field) -> Option<PendingSave> {
        self.slots[field.index()].take()
    }

    /// Drop every pending save.
    pub fn cancel_all(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Drop every pending save and refuse new ones until restart.
    pub fn freeze(&mut self) {
        self.cancel_all();
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_armed(&self, field: Field) -> bool {
        self.slots[field.index()].is_some()
    }

    pub fn pending(&self, field: Field) -> Option<PendingSave> {
        self.slots[field.index()]
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Milliseconds until the earliest pending save expires, if any.
    pub fn next_due_in(&self, now_ms: u32) -> Option<u32> {
        self.slots
            .iter()
            .flatten()
            .map(|p| {
                self.delay_ms
                    .saturating_sub(now_ms.wrapping_sub(p.armed_at_ms))
            })
            .min()
    }

    /// Issue every save whose quiet period has elapsed. Call once per
    /// control loop tick.
    pub fn tick(
        &mut self,
        now_ms: u32,
        delegate: &mut dyn SaveDelegate,
    ) -> Vec<SaveOutcome, { Field::COUNT }> {
        let mut outcomes = Vec::new();
        for field in Field::ALL {
            let slot = &mut self.slots[field.index()];
            let due = matches!(
                slot,
                Some(p) if now_ms.wrapping_sub(p.armed_at_ms) >= self.delay_ms
            );
            if !due {
                continue;
            }
            if let Some(p) = slot.take() {
                let outcome = Self::write(field, p.value, delegate);
                // Capacity equals the number of fields; cannot overflow.
                let _ = outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Write every pending value immediately, regardless of deadlines.
    pub fn flush(&mut self, delegate: &mut dyn SaveDelegate) -> Vec<SaveOutcome, { Field::COUNT }> {
        let mut outcomes = Vec::new();
        for field in Field::ALL {
            if let Some(p) = self.slots[field.index()].take() {
                let _ = outcomes.push(Self::write(field, p.value, delegate));
            }
        }
        outcomes
    }

    fn write(field: Field, value: Value, delegate: &mut dyn SaveDelegate) -> SaveOutcome {
        let result = delegate.on_save_due(field, value);
        match result {
            Ok(()) => info!("Saver: {} <- {:?}", field.key(), value),
            Err(e) => warn!("Saver: {} write failed: {}", field.key(), e),
        }
        SaveOutcome {
            field,
            value,
            result,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Periodic deadline
// ═══════════════════════════════════════════════════════════════

/// Fires every `interval_ms`, measured from the last fire.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicDeadline {
    interval_ms: u32,
    last_ms: u32,
}

impl PeriodicDeadline {
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Change the interval; the next fire is measured from `now_ms`.
    pub fn set_interval(&mut self, interval_ms: u32, now_ms: u32) {
        self.interval_ms = interval_ms;
        self.last_ms = now_ms;
    }

    /// Returns `true` once per elapsed interval.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_ms) >= self.interval_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
