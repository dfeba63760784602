//! Recording mock ports for integration tests.
//!
//! Every port call is recorded so tests can assert on the full history
//! without touching GPIO registers or flash.

use std::collections::HashMap;

use smartplug::app::actions::default_dispatcher;
use smartplug::app::characteristics::{Characteristic, Value};
use smartplug::app::controller::DeviceState;
use smartplug::app::events::AppEvent;
use smartplug::app::jobs::BackgroundJob;
use smartplug::app::ports::{
    EventSink, InputPort, NotifyPort, OutputPort, Ports, StorageError, StoragePort, TaskPort,
};
use smartplug::app::service::AppService;
use smartplug::config::PlugConfig;
use smartplug::drivers::debounce::LineId;
use smartplug::error::{OutputError, SpawnError};
use smartplug::pins::SONOFF_BASIC;

pub const RELAY: i32 = 12;
pub const LED: i32 = 13;
pub const BUTTON: i32 = 0;

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub writes: Vec<(i32, bool)>,
    /// Pins whose writes fail with the given code.
    pub failing: HashMap<i32, i32>,
    levels: HashMap<i32, bool>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn level(&self, gpio: i32) -> Option<bool> {
        self.levels.get(&gpio).copied()
    }

    pub fn writes_to(&self, gpio: i32) -> Vec<bool> {
        self.writes
            .iter()
            .filter(|(g, _)| *g == gpio)
            .map(|(_, l)| *l)
            .collect()
    }
}

impl OutputPort for MockHardware {
    fn write_output(&mut self, gpio: i32, level: bool) -> Result<(), OutputError> {
        self.writes.push((gpio, level));
        if let Some(&code) = self.failing.get(&gpio) {
            return Err(OutputError { gpio, code });
        }
        self.levels.insert(gpio, level);
        Ok(())
    }
}

/// Button line; idle HIGH (pull-up, active-low).
pub struct MockButton {
    pub pressed: bool,
}

impl InputPort for MockButton {
    fn read_input(&self, _gpio: i32) -> bool {
        !self.pressed
    }
}

// ── Protocol notifications ────────────────────────────────────

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Vec<(Characteristic, Value)>,
}

impl NotifyPort for MockNotifier {
    fn notify(&mut self, characteristic: Characteristic, value: Value) {
        self.sent.push((characteristic, value));
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub data: HashMap<(String, String), Vec<u8>>,
    pub write_log: Vec<String>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockStore {
    pub fn writes_of(&self, key: &str) -> usize {
        self.write_log.iter().filter(|k| *k == key).count()
    }
}

impl StoragePort for MockStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&(namespace.to_string(), key.to_string()))
            .ok_or(StorageError::NotFound)?;
        if v.len() > buf.len() {
            return Err(StorageError::Corrupted);
        }
        buf[..v.len()].copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.write_log.push(key.to_string());
        self.data
            .insert((namespace.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data
            .contains_key(&(namespace.to_string(), key.to_string()))
    }
}

// ── Background jobs ───────────────────────────────────────────

#[derive(Default)]
pub struct MockTasks {
    pub spawned: Vec<BackgroundJob>,
    pub refuse: bool,
}

impl TaskPort for MockTasks {
    fn spawn(&mut self, job: BackgroundJob) -> Result<(), SpawnError> {
        if self.refuse {
            return Err(SpawnError::ThreadCreateFailed);
        }
        self.spawned.push(job);
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Bench: service + mocks + simulated clock ──────────────────

pub struct Bench {
    pub app: AppService,
    pub hw: MockHardware,
    pub button: MockButton,
    pub notifier: MockNotifier,
    pub store: MockStore,
    pub tasks: MockTasks,
    pub sink: RecordingSink,
    pub now: u32,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::with_config(PlugConfig::default())
    }

    pub fn with_config(config: PlugConfig) -> Self {
        let dispatcher = default_dispatcher(LineId(SONOFF_BASIC.button.gpio))
            .expect("default bindings fit");
        let mut bench = Self {
            app: AppService::new(
                config,
                &SONOFF_BASIC,
                std::sync::Arc::new(DeviceState::new(false)),
                dispatcher,
            ),
            hw: MockHardware::default(),
            button: MockButton { pressed: false },
            notifier: MockNotifier::default(),
            store: MockStore::default(),
            tasks: MockTasks::default(),
            sink: RecordingSink::default(),
            now: 0,
        };
        bench
            .app
            .start(&mut bench.hw, &mut bench.sink, 0)
            .expect("outputs driven");
        bench
    }

    pub fn with<R>(
        &mut self,
        f: impl FnOnce(
            &mut AppService,
            u32,
            &mut Ports<'_, MockHardware, MockNotifier, MockStore, MockTasks, RecordingSink>,
        ) -> R,
    ) -> R {
        let mut ports = Ports {
            output: &mut self.hw,
            notify: &mut self.notifier,
            store: &mut self.store,
            tasks: &mut self.tasks,
            sink: &mut self.sink,
        };
        f(&mut self.app, self.now, &mut ports)
    }

    fn poll_interval(&self) -> u32 {
        self.app.config().poll_interval_ms
    }

    /// Advance the clock one poll interval and run one tick.
    pub fn step(&mut self) {
        self.now = self.now.wrapping_add(self.poll_interval());
        let button = MockButton {
            pressed: self.button.pressed,
        };
        self.with(|app, now, ports| app.poll_button(&button, now, ports));
    }

    /// Run ticks for `ms` milliseconds.
    pub fn run_for(&mut self, ms: u32) {
        let end = self.now.wrapping_add(ms);
        while end.wrapping_sub(self.now) as i32 > 0 {
            self.step();
        }
    }

    /// Hold the button for `held_ms`, then release.
    pub fn press(&mut self, held_ms: u32) {
        self.button.pressed = true;
        self.run_for(held_ms);
        self.button.pressed = false;
    }

    /// Run ticks until `cond` holds or `limit_ms` elapses. Returns the
    /// time at which it first held.
    pub fn run_until(&mut self, limit_ms: u32, mut cond: impl FnMut(&Self) -> bool) -> Option<u32> {
        let end = self.now.wrapping_add(limit_ms);
        while end.wrapping_sub(self.now) as i32 > 0 {
            self.step();
            if cond(self) {
                return Some(self.now);
            }
        }
        None
    }

    pub fn notifications_of(&self, c: Characteristic) -> Vec<Value> {
        self.notifier
            .sent
            .iter()
            .filter(|(ch, _)| *ch == c)
            .map(|(_, v)| *v)
            .collect()
    }
}
