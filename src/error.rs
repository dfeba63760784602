//! Unified error types for the plug firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform. All variants are `Copy` so they
//! can be passed through the controller and event sink without allocation.

use core::fmt;

use crate::app::characteristics::Characteristic;
use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral initialisation failed. Fatal at startup.
    Init(&'static str),
    /// A GPIO output could not be driven.
    Output(OutputError),
    /// Non-volatile storage failed.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A background job could not be started.
    Spawn(SpawnError),
    /// A protocol write was rejected.
    RemoteWrite(RemoteWriteError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Spawn(e) => write!(f, "spawn: {e}"),
            Self::RemoteWrite(e) => write!(f, "remote write: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(match e {
            HwInitError::GpioConfigFailed { .. } => "gpio_config failed",
            HwInitError::InvalidPin(_) => "pin out of range",
            HwInitError::TimerFailed(_) => "poll timer failed",
        })
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

/// A GPIO write was rejected by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputError {
    pub gpio: i32,
    /// Driver return code (`esp_err_t` on the device).
    pub code: i32,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{} write failed (rc={})", self.gpio, self.code)
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Background task errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// The thread could not be created (out of memory / task slots).
    ThreadCreateFailed,
    /// A terminal sequence (reset / OTA) is already running.
    RestartPending,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadCreateFailed => write!(f, "thread creation failed"),
            Self::RestartPending => write!(f, "restart already pending"),
        }
    }
}

impl From<SpawnError> for Error {
    fn from(e: SpawnError) -> Self {
        Self::Spawn(e)
    }
}

// ---------------------------------------------------------------------------
// Remote write errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWriteError {
    /// The value type does not match the characteristic.
    InvalidValue(Characteristic),
    /// The value is of the right type but outside the permitted range.
    OutOfRange(Characteristic),
    /// The inbound channel to the control loop is full.
    Busy,
}

impl fmt::Display for RemoteWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(c) => write!(f, "invalid value type for {c:?}"),
            Self::OutOfRange(c) => write!(f, "value out of range for {c:?}"),
            Self::Busy => write!(f, "control loop busy"),
        }
    }
}

impl From<RemoteWriteError> for Error {
    fn from(e: RemoteWriteError) -> Self {
        Self::RemoteWrite(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_error_display_names_pin() {
        let e: Error = OutputError { gpio: 12, code: -1 }.into();
        assert_eq!(e.to_string(), "output: GPIO12 write failed (rc=-1)");
    }

    #[test]
    fn init_failure_is_fatal_variant() {
        let e: Error = HwInitError::TimerFailed(-1).into();
        assert_eq!(e, Error::Init("poll timer failed"));
    }

    #[test]
    fn remote_write_error_converts() {
        let e: Error = RemoteWriteError::Busy.into();
        assert!(matches!(e, Error::RemoteWrite(RemoteWriteError::Busy)));
    }
}
