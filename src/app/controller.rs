//! Device state controller.
//!
//! [`DeviceController`] is the single writer of the switch's on/off value.
//! Every change runs the same pipeline, in order:
//!
//! 1. update the shared [`DeviceState`]
//! 2. drive the relay
//! 3. drive the status LED
//! 4. notify protocol subscribers (skipped for [`StateSource::PersistedRestore`])
//! 5. arm the debounced save for [`Field::On`] (skipped for restore as well,
//!    the value came from flash)
//!
//! Output failures do not short-circuit the pipeline: the in-memory state is
//! committed, the remaining steps run, and the first error is returned.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::error::OutputError;
use crate::pins::{BoardProfile, OutputPin};
use crate::scheduler::SaveScheduler;

use super::characteristics::{Characteristic, Field, Value};
use super::ports::{NotifyPort, OutputPort};

/// The switch value, shared by pointer between the control loop (writer)
/// and any other task that needs to read it.
#[derive(Debug, Default)]
pub struct DeviceState {
    on: AtomicBool,
}

impl DeviceState {
    pub const fn new(on: bool) -> Self {
        Self {
            on: AtomicBool::new(on),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    fn store(&self, on: bool) {
        self.on.store(on, Ordering::Release);
    }
}

/// Origin of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    Gesture,
    RemoteWrite,
    PersistedRestore,
}

impl StateSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gesture => "gesture",
            Self::RemoteWrite => "remote",
            Self::PersistedRestore => "restore",
        }
    }
}

pub struct DeviceController {
    state: Arc<DeviceState>,
    relay: OutputPin,
    led: OutputPin,
}

impl DeviceController {
    pub fn new(profile: &BoardProfile, state: Arc<DeviceState>) -> Self {
        Self {
            state,
            relay: profile.relay,
            led: profile.led,
        }
    }

    /// Shared handle for readers outside the control loop.
    pub fn shared(&self) -> Arc<DeviceState> {
        Arc::clone(&self.state)
    }

    pub fn get_state(&self) -> bool {
        self.state.is_on()
    }

    /// Commit `value` and run the change pipeline.
    pub fn set_state(
        &mut self,
        value: bool,
        source: StateSource,
        output: &mut impl OutputPort,
        notify: &mut impl NotifyPort,
        saves: &mut SaveScheduler,
        now_ms: u32,
    ) -> Result<(), OutputError> {
        self.state.store(value);
        info!("Switch {} ({})", if value { "ON" } else { "OFF" }, source.as_str());

        let result = self.drive_outputs(output);

        if source != StateSource::PersistedRestore {
            notify.notify(Characteristic::On, Value::Bool(value));
            saves.schedule_save(Field::On, Value::Bool(value), now_ms);
        }

        result
    }

    /// Flip the current value. Returns the new value.
    pub fn toggle(
        &mut self,
        source: StateSource,
        output: &mut impl OutputPort,
        notify: &mut impl NotifyPort,
        saves: &mut SaveScheduler,
        now_ms: u32,
    ) -> (bool, Result<(), OutputError>) {
        let next = !self.get_state();
        let result = self.set_state(next, source, output, notify, saves, now_ms);
        (next, result)
    }

    /// Drive relay and LED to mirror the current value. Both writes are
    /// attempted; the first failure is returned.
    pub fn drive_outputs(&self, output: &mut impl OutputPort) -> Result<(), OutputError> {
        let on = self.state.is_on();
        let relay = output.write_output(self.relay.gpio, self.relay.active.level_for(on));
        let led = output.write_output(self.led.gpio, self.led.active.level_for(on));
        if let Err(e) = relay {
            warn!("Relay write failed: {}", e);
        }
        if let Err(e) = led {
            warn!("LED write failed: {}", e);
        }
        relay.and(led)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::SONOFF_BASIC;

    #[derive(Default)]
    struct Pins {
        writes: Vec<(i32, bool)>,
        fail_gpio: Option<i32>,
    }

    impl OutputPort for Pins {
        fn write_output(&mut self, gpio: i32, level: bool) -> Result<(), OutputError> {
            self.writes.push((gpio, level));
            match self.fail_gpio {
                Some(g) if g == gpio => Err(OutputError { gpio, code: -1 }),
                _ => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct Notes(Vec<(Characteristic, Value)>);

    impl NotifyPort for Notes {
        fn notify(&mut self, c: Characteristic, v: Value) {
            self.0.push((c, v));
        }
    }

    fn controller() -> DeviceController {
        DeviceController::new(&SONOFF_BASIC, Arc::new(DeviceState::new(false)))
    }

    #[test]
    fn remote_write_drives_outputs_with_polarity() {
        let mut c = controller();
        let (mut pins, mut notes) = (Pins::default(), Notes::default());
        let mut saves = SaveScheduler::new(2000);

        c.set_state(true, StateSource::RemoteWrite, &mut pins, &mut notes, &mut saves, 0)
            .unwrap();

        assert!(c.get_state());
        // Relay active-high, LED active-low.
        assert_eq!(pins.writes, vec![(12, true), (13, false)]);
        assert_eq!(notes.0, vec![(Characteristic::On, Value::Bool(true))]);
        assert!(saves.is_armed(Field::On));
    }

    #[test]
    fn restore_is_silent() {
        let mut c = controller();
        let (mut pins, mut notes) = (Pins::default(), Notes::default());
        let mut saves = SaveScheduler::new(2000);

        c.set_state(true, StateSource::PersistedRestore, &mut pins, &mut notes, &mut saves, 0)
            .unwrap();

        assert!(c.get_state());
        assert_eq!(pins.writes.len(), 2);
        assert!(notes.0.is_empty());
        assert!(!saves.is_armed(Field::On));
    }

    #[test]
    fn output_failure_still_commits_and_notifies() {
        let mut c = controller();
        let mut pins = Pins {
            fail_gpio: Some(12),
            ..Default::default()
        };
        let mut notes = Notes::default();
        let mut saves = SaveScheduler::new(2000);

        let err = c
            .set_state(true, StateSource::Gesture, &mut pins, &mut notes, &mut saves, 0)
            .unwrap_err();

        assert_eq!(err.gpio, 12);
        assert!(c.get_state());
        // LED write still attempted.
        assert_eq!(pins.writes.len(), 2);
        assert_eq!(notes.0.len(), 1);
        assert!(saves.is_armed(Field::On));
    }

    #[test]
    fn toggle_flips_and_shares_state() {
        let mut c = controller();
        let shared = c.shared();
        let (mut pins, mut notes) = (Pins::default(), Notes::default());
        let mut saves = SaveScheduler::new(2000);

        let (on, res) = c.toggle(StateSource::Gesture, &mut pins, &mut notes, &mut saves, 0);
        assert!(on && res.is_ok());
        assert!(shared.is_on());

        let (on, _) = c.toggle(StateSource::Gesture, &mut pins, &mut notes, &mut saves, 10);
        assert!(!on);
        assert!(!shared.is_on());
    }
}
