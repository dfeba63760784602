//! Bridge between the home-automation protocol server and the control loop.
//!
//! The server runs in its own task. Remote writes are validated at the
//! boundary, queued on a bounded channel and announced with
//! [`Event::RemoteWrite`]; the control loop drains them. Change
//! notifications flow the other way over a second channel that the server
//! task empties and forwards to subscribed controllers.
//!
//! ```text
//! ┌──────────────┐ RemoteWriteMsg ┌──────────────┐
//! │ Protocol task│──────────────▶│ Control loop │
//! │              │◀──────────────│              │
//! └──────────────┘  Notification └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};

use crate::app::characteristics::{Characteristic, Value};
use crate::app::commands::AppCommand;
use crate::app::ports::NotifyPort;
use crate::error::RemoteWriteError;
use crate::events::{push_event, Event};

/// One characteristic write received from a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteWriteMsg {
    pub characteristic: Characteristic,
    pub value: Value,
}

/// One outbound change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub characteristic: Characteristic,
    pub value: Value,
}

const WRITE_DEPTH: usize = 8;
const NOTIFY_DEPTH: usize = 16;

/// Inbound: protocol task → control loop.
pub static REMOTE_WRITES: Channel<CriticalSectionRawMutex, RemoteWriteMsg, WRITE_DEPTH> =
    Channel::new();

/// Outbound: control loop → protocol task.
pub static NOTIFICATIONS: Channel<CriticalSectionRawMutex, Notification, NOTIFY_DEPTH> =
    Channel::new();

/// Setter entry point for the protocol server.
///
/// Rejects a mistyped or out-of-range value before it reaches the loop.
/// Returns [`RemoteWriteError::Busy`] when the queue is full so the server
/// can answer the controller with a resource-busy status.
pub fn on_remote_write(characteristic: Characteristic, value: Value) -> Result<(), RemoteWriteError> {
    characteristic.validate(value)?;
    REMOTE_WRITES
        .try_send(RemoteWriteMsg {
            characteristic,
            value,
        })
        .map_err(|_| RemoteWriteError::Busy)?;
    push_event(Event::RemoteWrite);
    Ok(())
}

/// Called once by the protocol server after it has started.
pub fn protocol_ready() {
    push_event(Event::ProtocolReady);
}

/// Next queued remote write as an application command.
pub fn take_remote_write() -> Option<AppCommand> {
    REMOTE_WRITES
        .try_receive()
        .ok()
        .map(|msg| AppCommand::RemoteWrite {
            characteristic: msg.characteristic,
            value: msg.value,
        })
}

/// Next notification for the server task to publish.
pub fn take_notification() -> Option<Notification> {
    NOTIFICATIONS.try_receive().ok()
}

/// [`NotifyPort`] backed by [`NOTIFICATIONS`].
#[derive(Debug, Default)]
pub struct ProtocolNotifier {
    dropped: u32,
}

impl ProtocolNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications lost because the server task fell behind.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl NotifyPort for ProtocolNotifier {
    fn notify(&mut self, characteristic: Characteristic, value: Value) {
        match NOTIFICATIONS.try_send(Notification {
            characteristic,
            value,
        }) {
            Ok(()) => debug!("Notify: {:?} = {:?}", characteristic, value),
            Err(_) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!("Notify: queue full, dropped {:?} = {:?}", characteristic, value);
            }
        }
    }
}
