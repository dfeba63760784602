//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements          | Connects to                  |
//! |---------------|---------------------|------------------------------|
//! | `hardware`    | OutputPort          | Relay / LED GPIO             |
//! |               | InputPort           | Button GPIO                  |
//! | `log_sink`    | EventSink           | Serial log output            |
//! | `maintenance` | MaintenancePort     | NVS erase, OTA flags, reboot |
//! | `nvs`         | ConfigPort          | NVS / in-memory store        |
//! |               | StoragePort         |                              |
//! | `protocol`    | NotifyPort          | Protocol server task         |
//! | `tasks`       | TaskPort            | Core-pinned job threads      |
//! | `time`        | -                   | ESP32 system timer           |
//! | `device_id`   | -                   | eFuse MAC → serial number    |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod maintenance;
pub mod nvs;
pub mod protocol;
pub mod tasks;
pub mod time;
