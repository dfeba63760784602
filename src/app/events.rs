//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them (log to serial, count them in tests).

use crate::drivers::button::Gesture;
use crate::error::{OutputError, SpawnError};

use super::characteristics::{Characteristic, Field, Value};
use super::controller::StateSource;
use super::ports::StorageError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started (carries the initial switch value).
    Started { on: bool },

    /// A gesture was classified, with the number of handlers it ran.
    Gesture { gesture: Gesture, handlers: usize },

    /// The switch value was committed.
    StateChanged { on: bool, source: StateSource },

    /// A relay or LED write failed. The in-memory state was still updated.
    OutputFault(OutputError),

    /// A persisted field was restored at boot.
    Restored { field: Field, value: Value },

    /// A debounced save was written.
    SaveWritten { field: Field, value: Value },

    /// A debounced save failed; it will not be retried.
    SaveFailed { field: Field, error: StorageError },

    /// A remote write to a non-state characteristic was applied.
    CharacteristicWritten { characteristic: Characteristic, value: Value },

    /// A background job was handed to the task runner.
    JobStarted(&'static str),

    /// A background job could not be started.
    JobFailed { job: &'static str, error: SpawnError },

    /// A task-statistics dump was requested.
    TaskStatsRequested,

    /// The WiFi health-check interval elapsed.
    WifiCheckDue,
}
