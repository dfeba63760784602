//! Smart-plug firmware: main entry point.
//!
//! Hexagonal architecture driven by a coalescing event set.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioHardware      LogEventSink   NvsAdapter   Esp32TimeAdapter│
//! │  (Output+Input)    (EventSink)    (Config+NVS)                 │
//! │  ProtocolNotifier  ThreadTaskAdapter → JobRunner/EspMaintenance│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Button · Dispatcher · Controller · SaveScheduler      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Poll timer ──▶ Event set ◀── Protocol task, job threads       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};

use smartplug::adapters::device_id::{self, AccessoryInfo};
use smartplug::adapters::hardware::GpioHardware;
use smartplug::adapters::log_sink::LogEventSink;
use smartplug::adapters::nvs::NvsAdapter;
use smartplug::adapters::protocol::{self, ProtocolNotifier};
use smartplug::adapters::tasks::ThreadTaskAdapter;
use smartplug::adapters::time::Esp32TimeAdapter;
use smartplug::app::actions::default_dispatcher;
use smartplug::app::commands::AppCommand;
use smartplug::app::controller::DeviceState;
use smartplug::app::jobs::JobTimings;
use smartplug::app::ports::{ConfigPort, Ports};
use smartplug::app::service::AppService;
use smartplug::config::PlugConfig;
use smartplug::drivers::debounce::LineId;
use smartplug::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use smartplug::error::Error;
use smartplug::events::{self, Event};
use smartplug::pins::BOARD;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();
    #[cfg(target_os = "espidf")]
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartPlug v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let accessory = AccessoryInfo::from_mac(&device_id::read_mac());
    info!(
        "Accessory: {} / {} / {} serial={} fw={}",
        accessory.name,
        accessory.manufacturer,
        accessory.model,
        accessory.serial,
        accessory.firmware_revision
    );

    // ── 2. Peripherals (fatal) ────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(&BOARD) {
        error!("Peripheral init failed: {}, aborting", e);
        return Err(Error::from(e).into());
    }

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running without persistence", e);
            NvsAdapter::handle()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            PlugConfig::default()
        }
    };

    // ── 4. Poll timer + watchdog ──────────────────────────────
    if let Err(e) = hw_timer::start_poll_timer(config.poll_interval_ms) {
        error!("Poll timer failed: {}, aborting", e);
        return Err(Error::from(e).into());
    }
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    // ── 5. Adapters ───────────────────────────────────────────
    let time = Esp32TimeAdapter::new();
    let state = Arc::new(DeviceState::new(false));
    let mut hw = GpioHardware::new();
    let input = GpioHardware::new();
    let mut notifier = ProtocolNotifier::new();
    let mut tasks = ThreadTaskAdapter::new(BOARD.led, JobTimings::from_config(&config));
    let mut sink = LogEventSink::new();

    // ── 6. App service: outputs off, then restore ─────────────
    let dispatcher = default_dispatcher(LineId(BOARD.button.gpio))?;
    let loop_ms = config.poll_interval_ms;
    let mut app = AppService::new(config, &BOARD, state, dispatcher);
    app.start(&mut hw, &mut sink, time.now_ms())
        .map_err(Error::from)?;

    let mut ports = Ports {
        output: &mut hw,
        notify: &mut notifier,
        store: &mut nvs,
        tasks: &mut tasks,
        sink: &mut sink,
    };
    app.restore(time.now_ms(), &mut ports);

    info!("System ready. Waiting for protocol server, entering event loop.");

    // ── 7. Event loop ─────────────────────────────────────────
    loop {
        // On the host nothing fires the poll timer; tick by hand.
        #[cfg(not(target_os = "espidf"))]
        hw_timer::sim_tick();

        events::drain_events(|event| {
            let now = time.now_ms();
            match event {
                Event::ButtonPollTick => app.poll_button(&input, now, &mut ports),
                Event::RemoteWrite => {
                    while let Some(cmd) = protocol::take_remote_write() {
                        if let Err(e) = app.handle_command(cmd, now, &mut ports) {
                            warn!("Remote write rejected: {}", e);
                        }
                    }
                }
                Event::ProtocolReady => {
                    if let Err(e) = app.handle_command(AppCommand::ProtocolReady, now, &mut ports)
                    {
                        warn!("Announce failed: {}", e);
                    }
                }
                Event::JobFinished => app.refresh_outputs(ports.output, ports.sink),
            }
        });

        watchdog.feed();

        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(loop_ms);
        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(loop_ms)));
    }
}
