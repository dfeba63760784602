//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { on } => {
                info!("START | switch={}", on_off(*on));
            }
            AppEvent::Gesture { gesture, handlers } => {
                info!(
                    "GESTURE | gpio={} | {:?} | handlers={}",
                    gesture.line.0, gesture.kind, handlers
                );
            }
            AppEvent::StateChanged { on, source } => {
                info!("STATE | switch={} | source={}", on_off(*on), source.as_str());
            }
            AppEvent::OutputFault(e) => {
                warn!("FAULT | {}", e);
            }
            AppEvent::Restored { field, value } => {
                info!("RESTORE | {}={:?}", field.key(), value);
            }
            AppEvent::SaveWritten { field, value } => {
                info!("SAVE | {}={:?}", field.key(), value);
            }
            AppEvent::SaveFailed { field, error } => {
                warn!("SAVE | {} failed: {}", field.key(), error);
            }
            AppEvent::CharacteristicWritten {
                characteristic,
                value,
            } => {
                info!("WRITE | {:?}={:?}", characteristic, value);
            }
            AppEvent::JobStarted(name) => {
                info!("JOB | {} started", name);
            }
            AppEvent::JobFailed { job, error } => {
                warn!("JOB | {} not started: {}", job, error);
            }
            AppEvent::TaskStatsRequested => {
                info!("STATS | task statistics requested");
            }
            AppEvent::WifiCheckDue => {
                log::debug!("WIFI | health check due");
            }
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
