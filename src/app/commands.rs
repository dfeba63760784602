//! Inbound commands to the application service.
//!
//! These represent requests from the outside world (the protocol server,
//! the boot sequence) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.

use super::characteristics::{Characteristic, Value};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// A protocol controller wrote a characteristic.
    RemoteWrite {
        characteristic: Characteristic,
        value: Value,
    },

    /// The protocol server is up; announce every persisted value once.
    ProtocolReady,

    /// Write every pending save immediately (e.g. before a planned restart).
    FlushSaves,
}
