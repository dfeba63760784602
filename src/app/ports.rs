//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (GPIO, protocol server, NVS, background threads, event
//! sinks) implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! Polarity is *not* a port concern: ports move raw pin levels, the
//! [`DeviceController`](super::controller::DeviceController) decides what
//! level means "on".

use crate::config::PlugConfig;
use crate::error::{OutputError, SpawnError};

use super::characteristics::{Characteristic, Field, Value};
use super::jobs::BackgroundJob;

// ───────────────────────────────────────────────────────────────
// Physical I/O (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Write-side GPIO port.
pub trait OutputPort {
    /// Drive `gpio` to the raw electrical `level` (true = HIGH).
    fn write_output(&mut self, gpio: i32, level: bool) -> Result<(), OutputError>;
}

/// Read-side GPIO port.
pub trait InputPort {
    /// Raw electrical level of `gpio` (true = HIGH).
    fn read_input(&self, gpio: i32) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Protocol server (driven adapter: domain → home-automation protocol)
// ───────────────────────────────────────────────────────────────

/// Outbound change notifications to subscribed protocol controllers.
pub trait NotifyPort {
    fn notify(&mut self, characteristic: Characteristic, value: Value);
}

// ───────────────────────────────────────────────────────────────
// Background work (driven adapter: domain → worker threads)
// ───────────────────────────────────────────────────────────────

/// Runs slow, terminal or fire-and-forget sequences off the control loop.
///
/// Jobs run to completion; there is no cancellation.
pub trait TaskPort {
    fn spawn(&mut self, job: BackgroundJob) -> Result<(), SpawnError>;
}

/// Reset/OTA collaborator invoked from background jobs.
pub trait MaintenancePort {
    /// Erase WiFi credentials and protocol pairing data.
    fn reset_configuration(&mut self);

    /// Arm the OTA updater for the next boot.
    fn request_ota_update(&mut self, beta: bool, loader_beta: bool);

    /// Reboot the device. Does not return on real hardware.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the timing configuration.
///
/// Implementations MUST validate values before persisting and reject
/// invalid ranges with [`ConfigError::ValidationFailed`] rather than
/// clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`PlugConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<PlugConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &PlugConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Write operations MUST be atomic, no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Save delegate (decouples the save scheduler from storage)
// ───────────────────────────────────────────────────────────────

/// Callback the [`SaveScheduler`](crate::scheduler::SaveScheduler) invokes
/// when a field's quiet period has elapsed.
pub trait SaveDelegate {
    fn on_save_due(&mut self, field: Field, value: Value) -> Result<(), StorageError>;
}

impl<F> SaveDelegate for F
where
    F: FnMut(Field, Value) -> Result<(), StorageError>,
{
    fn on_save_due(&mut self, field: Field, value: Value) -> Result<(), StorageError> {
        self(field, value)
    }
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Borrowed set of driven ports handed to the service on each call.
pub struct Ports<'a, O, N, S, T, E> {
    pub output: &'a mut O,
    pub notify: &'a mut N,
    pub store: &'a mut S,
    pub tasks: &'a mut T,
    pub sink: &'a mut E,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored bytes could not be decoded.
    Corrupted,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Corrupted => write!(f, "stored value corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
