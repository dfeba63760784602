//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the button pipeline, the gesture registry, the
//! device controller and the save scheduler. It exposes a clean,
//! hardware-agnostic API. All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  raw sample ──▶ ┌──────────────────────────────────────┐ ──▶ OutputPort
//!                 │             AppService               │ ──▶ NotifyPort
//! remote write ──▶│ Button · Dispatcher · Controller ·   │ ──▶ StoragePort
//!                 │ SaveScheduler · WiFi-check deadline  │ ──▶ TaskPort
//!                 └──────────────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! The control loop is the only caller, so every state mutation is
//! serialised through it.

use std::sync::Arc;

use log::{info, warn};

use crate::config::PlugConfig;
use crate::drivers::button::{ButtonDriver, Gesture};
use crate::error::{OutputError, RemoteWriteError, SpawnError};
use crate::pins::BoardProfile;
use crate::scheduler::{PeriodicDeadline, SaveScheduler};

use super::characteristics::{Characteristic, Field, Value};
use super::commands::AppCommand;
use super::controller::{DeviceController, DeviceState, StateSource};
use super::dispatcher::{ActionDispatcher, GestureActions};
use super::events::AppEvent;
use super::jobs::BackgroundJob;
use super::persist;
use super::ports::{EventSink, InputPort, NotifyPort, OutputPort, Ports, StoragePort, TaskPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: PlugConfig,
    controller: DeviceController,
    dispatcher: ActionDispatcher,
    button: ButtonDriver,
    saves: SaveScheduler,
    wifi_check: PeriodicDeadline,
    wifi_check_interval: u8,
    ota_beta: bool,
    lcm_beta: bool,
    /// A reset or OTA job is running; the device is about to restart.
    restart_pending: bool,
}

impl AppService {
    /// Construct the service. Does **not** touch any output; call
    /// [`start`](Self::start) next.
    pub fn new(
        config: PlugConfig,
        profile: &BoardProfile,
        state: Arc<DeviceState>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        let controller = DeviceController::new(profile, state);
        let button = ButtonDriver::new(profile.button, &config);
        let saves = SaveScheduler::new(config.save_delay_ms);
        let wifi_check_interval = config.wifi_check_interval_secs;
        let wifi_check = PeriodicDeadline::new(secs_to_ms(wifi_check_interval), 0);

        Self {
            config,
            controller,
            dispatcher,
            button,
            saves,
            wifi_check,
            wifi_check_interval,
            ota_beta: false,
            lcm_beta: false,
            restart_pending: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the outputs to the current (default off) value.
    pub fn start(
        &mut self,
        output: &mut impl OutputPort,
        sink: &mut impl EventSink,
        now_ms: u32,
    ) -> Result<(), OutputError> {
        self.controller.drive_outputs(output)?;
        self.wifi_check.set_interval(secs_to_ms(self.wifi_check_interval), now_ms);
        let on = self.controller.get_state();
        sink.emit(&AppEvent::Started { on });
        info!("AppService started (switch {})", if on { "ON" } else { "OFF" });
        Ok(())
    }

    /// Load every persisted field and apply it without notifying or
    /// re-saving. Missing or corrupt entries keep their defaults.
    pub fn restore<O, N, S, T, E>(&mut self, now_ms: u32, ports: &mut Ports<'_, O, N, S, T, E>)
    where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        for field in Field::ALL {
            let value = match persist::load_field(&*ports.store, field) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    info!("Restore: {} not stored, keeping default", field.key());
                    continue;
                }
                Err(e) => {
                    warn!("Restore: {} unreadable: {}", field.key(), e);
                    continue;
                }
            };

            match (field, value) {
                (Field::On, Value::Bool(on)) => {
                    let res = self.controller.set_state(
                        on,
                        StateSource::PersistedRestore,
                        ports.output,
                        ports.notify,
                        &mut self.saves,
                        now_ms,
                    );
                    ports.sink.emit(&AppEvent::StateChanged {
                        on,
                        source: StateSource::PersistedRestore,
                    });
                    if let Err(e) = res {
                        ports.sink.emit(&AppEvent::OutputFault(e));
                    }
                }
                (Field::WifiCheckInterval, Value::U8(secs)) => {
                    self.apply_wifi_interval(secs, now_ms);
                }
                // load_field rejects mismatched shapes.
                _ => continue,
            }
            ports.sink.emit(&AppEvent::Restored { field, value });
        }
    }

    /// Redrive relay and LED from the committed value, e.g. after a
    /// background job has borrowed the LED.
    pub fn refresh_outputs(&self, output: &mut impl OutputPort, sink: &mut impl EventSink) {
        if let Err(e) = self.controller.drive_outputs(output) {
            sink.emit(&AppEvent::OutputFault(e));
        }
    }

    /// Notify the current value of every persisted characteristic.
    pub fn announce(&self, notify: &mut impl NotifyPort) {
        for field in Field::ALL {
            notify.notify(field.characteristic(), self.field_value(field));
        }
        info!("Announced persisted characteristics");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Sample the button through `input`, then run one tick.
    pub fn poll_button<I, O, N, S, T, E>(
        &mut self,
        input: &I,
        now_ms: u32,
        ports: &mut Ports<'_, O, N, S, T, E>,
    ) where
        I: InputPort,
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        let raw = input.read_input(self.button.line().0);
        self.tick(raw, now_ms, ports);
    }

    /// Run one control cycle: raw button sample → gesture → actions,
    /// then the save and WiFi-check deadlines.
    pub fn tick<O, N, S, T, E>(
        &mut self,
        raw_level: bool,
        now_ms: u32,
        ports: &mut Ports<'_, O, N, S, T, E>,
    ) where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        if let Some(gesture) = self.button.tick(raw_level, now_ms) {
            self.on_gesture(gesture, now_ms, ports);
        }
        self.run_deadlines(now_ms, ports);
    }

    fn on_gesture<O, N, S, T, E>(
        &mut self,
        gesture: Gesture,
        now_ms: u32,
        ports: &mut Ports<'_, O, N, S, T, E>,
    ) where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        let mut ctx = ActionContext {
            controller: &mut self.controller,
            saves: &mut self.saves,
            restart_pending: &mut self.restart_pending,
            ports: &mut *ports,
            now_ms,
        };
        let handlers = self.dispatcher.dispatch(&gesture, &mut ctx);
        ports.sink.emit(&AppEvent::Gesture { gesture, handlers });
    }

    fn run_deadlines<O, N, S, T, E>(&mut self, now_ms: u32, ports: &mut Ports<'_, O, N, S, T, E>)
    where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        let store = &mut *ports.store;
        let mut writer =
            |field: Field, value: Value| persist::save_field(&mut *store, field, value);
        let outcomes = self.saves.tick(now_ms, &mut writer);
        for o in outcomes {
            ports.sink.emit(&match o.result {
                Ok(()) => AppEvent::SaveWritten {
                    field: o.field,
                    value: o.value,
                },
                Err(error) => AppEvent::SaveFailed {
                    field: o.field,
                    error,
                },
            });
        }

        if self.wifi_check.poll(now_ms) {
            ports.sink.emit(&AppEvent::WifiCheckDue);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the protocol adapter or boot
    /// sequence).
    pub fn handle_command<O, N, S, T, E>(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        ports: &mut Ports<'_, O, N, S, T, E>,
    ) -> Result<(), RemoteWriteError>
    where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        match cmd {
            AppCommand::RemoteWrite {
                characteristic,
                value,
            } => self.on_remote_write(characteristic, value, now_ms, ports),
            AppCommand::ProtocolReady => {
                self.announce(ports.notify);
                Ok(())
            }
            AppCommand::FlushSaves => {
                self.flush_saves(ports);
                Ok(())
            }
        }
    }

    /// Apply a protocol write. Only type/range errors are returned; job
    /// start failures are reported through the event sink.
    pub fn on_remote_write<O, N, S, T, E>(
        &mut self,
        characteristic: Characteristic,
        value: Value,
        now_ms: u32,
        ports: &mut Ports<'_, O, N, S, T, E>,
    ) -> Result<(), RemoteWriteError>
    where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        characteristic.validate(value)?;
        let flag = value.as_bool().unwrap_or(false);

        match characteristic {
            Characteristic::On => {
                let res = self.controller.set_state(
                    flag,
                    StateSource::RemoteWrite,
                    ports.output,
                    ports.notify,
                    &mut self.saves,
                    now_ms,
                );
                ports.sink.emit(&AppEvent::StateChanged {
                    on: flag,
                    source: StateSource::RemoteWrite,
                });
                if let Err(e) = res {
                    ports.sink.emit(&AppEvent::OutputFault(e));
                }
                return Ok(());
            }
            Characteristic::WifiCheckInterval => {
                let secs = value
                    .as_u8()
                    .ok_or(RemoteWriteError::InvalidValue(characteristic))?;
                self.apply_wifi_interval(secs, now_ms);
                ports.notify.notify(characteristic, value);
                self.saves
                    .schedule_save(Field::WifiCheckInterval, value, now_ms);
            }
            Characteristic::WifiReset => {
                if flag {
                    spawn_job(
                        BackgroundJob::FactoryReset,
                        &mut self.saves,
                        &mut self.restart_pending,
                        ports,
                    );
                }
            }
            Characteristic::OtaTrigger => {
                if flag {
                    spawn_job(
                        BackgroundJob::OtaUpdate {
                            beta: self.ota_beta,
                            loader_beta: self.lcm_beta,
                        },
                        &mut self.saves,
                        &mut self.restart_pending,
                        ports,
                    );
                }
            }
            Characteristic::OtaBeta => self.ota_beta = flag,
            Characteristic::LcmBeta => self.lcm_beta = flag,
            Characteristic::TaskStats => {
                if flag {
                    ports.sink.emit(&AppEvent::TaskStatsRequested);
                }
            }
            Characteristic::Identify => {
                spawn_job(
                    BackgroundJob::Identify {
                        blinks: self.config.identify_blinks,
                    },
                    &mut self.saves,
                    &mut self.restart_pending,
                    ports,
                );
            }
        }

        ports.sink.emit(&AppEvent::CharacteristicWritten {
            characteristic,
            value,
        });
        Ok(())
    }

    /// Write every pending save now.
    pub fn flush_saves<O, N, S, T, E>(&mut self, ports: &mut Ports<'_, O, N, S, T, E>)
    where
        O: OutputPort,
        N: NotifyPort,
        S: StoragePort,
        T: TaskPort,
        E: EventSink,
    {
        flush_pending(&mut self.saves, ports);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_on(&self) -> bool {
        self.controller.get_state()
    }

    /// Shared state handle for readers outside the control loop.
    pub fn shared_state(&self) -> Arc<DeviceState> {
        self.controller.shared()
    }

    pub fn config(&self) -> &PlugConfig {
        &self.config
    }

    pub fn wifi_check_interval(&self) -> u8 {
        self.wifi_check_interval
    }

    pub fn ota_beta(&self) -> bool {
        self.ota_beta
    }

    pub fn lcm_beta(&self) -> bool {
        self.lcm_beta
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    pub fn save_scheduler(&self) -> &SaveScheduler {
        &self.saves
    }

    /// Current value of a persisted field.
    pub fn field_value(&self, field: Field) -> Value {
        match field {
            Field::On => Value::Bool(self.controller.get_state()),
            Field::WifiCheckInterval => Value::U8(self.wifi_check_interval),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_wifi_interval(&mut self, secs: u8, now_ms: u32) {
        self.wifi_check_interval = secs;
        self.wifi_check.set_interval(secs_to_ms(secs), now_ms);
        info!("WiFi check interval {}s", secs);
    }
}

fn secs_to_ms(secs: u8) -> u32 {
    u32::from(secs) * 1000
}

// ───────────────────────────────────────────────────────────────
// Background job hand-off
// ───────────────────────────────────────────────────────────────

/// Hand `job` to the task runner. Terminal jobs settle pending saves first
/// (OTA keeps settings so they are flushed; a factory reset discards them
/// and freezes the scheduler once the job is running) and block further
/// terminal jobs.
fn spawn_job<O, N, S, T, E>(
    job: BackgroundJob,
    saves: &mut SaveScheduler,
    restart_pending: &mut bool,
    ports: &mut Ports<'_, O, N, S, T, E>,
) where
    O: OutputPort,
    N: NotifyPort,
    S: StoragePort,
    T: TaskPort,
    E: EventSink,
{
    if job.is_terminal() && *restart_pending {
        ports.sink.emit(&AppEvent::JobFailed {
            job: job.name(),
            error: SpawnError::RestartPending,
        });
        return;
    }

    match job {
        BackgroundJob::FactoryReset => saves.cancel_all(),
        BackgroundJob::OtaUpdate { .. } => flush_pending(saves, ports),
        BackgroundJob::Identify { .. } => {}
    }

    match ports.tasks.spawn(job) {
        Ok(()) => {
            if job.is_terminal() {
                *restart_pending = true;
            }
            // The reset job is already erasing the plug fields.
            if job == BackgroundJob::FactoryReset {
                saves.freeze();
            }
            ports.sink.emit(&AppEvent::JobStarted(job.name()));
        }
        Err(error) => {
            warn!("Job {} not started: {}", job.name(), error);
            ports.sink.emit(&AppEvent::JobFailed {
                job: job.name(),
                error,
            });
        }
    }
}

fn flush_pending<O, N, S, T, E>(saves: &mut SaveScheduler, ports: &mut Ports<'_, O, N, S, T, E>)
where
    O: OutputPort,
    N: NotifyPort,
    S: StoragePort,
    T: TaskPort,
    E: EventSink,
{
    let store = &mut *ports.store;
    let mut writer = |field: Field, value: Value| persist::save_field(&mut *store, field, value);
    for o in saves.flush(&mut writer) {
        ports.sink.emit(&match o.result {
            Ok(()) => AppEvent::SaveWritten {
                field: o.field,
                value: o.value,
            },
            Err(error) => AppEvent::SaveFailed {
                field: o.field,
                error,
            },
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Gesture action context
// ───────────────────────────────────────────────────────────────

/// What handlers see while a gesture is being dispatched.
struct ActionContext<'s, 'p, O, N, S, T, E> {
    controller: &'s mut DeviceController,
    saves: &'s mut SaveScheduler,
    restart_pending: &'s mut bool,
    ports: &'s mut Ports<'p, O, N, S, T, E>,
    now_ms: u32,
}

impl<O, N, S, T, E> GestureActions for ActionContext<'_, '_, O, N, S, T, E>
where
    O: OutputPort,
    N: NotifyPort,
    S: StoragePort,
    T: TaskPort,
    E: EventSink,
{
    fn toggle(&mut self) {
        let (on, res) = self.controller.toggle(
            StateSource::Gesture,
            self.ports.output,
            self.ports.notify,
            self.saves,
            self.now_ms,
        );
        self.ports.sink.emit(&AppEvent::StateChanged {
            on,
            source: StateSource::Gesture,
        });
        if let Err(e) = res {
            self.ports.sink.emit(&AppEvent::OutputFault(e));
        }
    }

    fn factory_reset(&mut self) {
        spawn_job(
            BackgroundJob::FactoryReset,
            self.saves,
            self.restart_pending,
            self.ports,
        );
    }

    fn log_gesture(&mut self, gesture: &Gesture) {
        info!(
            "Button event {:?} press on GPIO{}",
            gesture.kind, gesture.line.0
        );
    }
}
