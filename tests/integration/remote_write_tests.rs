//! Protocol-side flows: remote writes, restore at boot, announce.

use smartplug::app::characteristics::{Characteristic, Field, Value};
use smartplug::app::commands::AppCommand;
use smartplug::app::events::AppEvent;
use smartplug::app::jobs::BackgroundJob;
use smartplug::app::persist;
use smartplug::app::ports::OutputPort;
use smartplug::config::PlugConfig;
use smartplug::error::{RemoteWriteError, SpawnError};

use super::mock_hw::{Bench, LED, RELAY};

fn write(b: &mut Bench, c: Characteristic, v: Value) -> Result<(), RemoteWriteError> {
    b.with(|app, now, ports| {
        app.handle_command(
            AppCommand::RemoteWrite {
                characteristic: c,
                value: v,
            },
            now,
            ports,
        )
    })
}

#[test]
fn remote_on_drives_relay_notifies_and_saves() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();

    assert!(b.app.is_on());
    assert_eq!(b.hw.level(RELAY), Some(true));
    assert_eq!(b.notifications_of(Characteristic::On), vec![Value::Bool(true)]);

    b.run_for(2100);
    assert_eq!(b.store.writes_of(Field::On.key()), 1);
}

#[test]
fn restore_applies_without_notify_or_save() {
    let mut b = Bench::new();
    persist::save_field(&mut b.store, Field::On, Value::Bool(true)).unwrap();
    persist::save_field(&mut b.store, Field::WifiCheckInterval, Value::U8(30)).unwrap();
    b.store.write_log.clear();

    b.with(|app, now, ports| app.restore(now, ports));
    b.run_for(5000);

    assert!(b.app.is_on());
    assert_eq!(b.hw.level(RELAY), Some(true));
    assert_eq!(b.app.wifi_check_interval(), 30);
    assert!(b.notifier.sent.is_empty());
    assert!(b.store.write_log.is_empty());
}

#[test]
fn corrupt_field_keeps_default() {
    let mut b = Bench::new();
    b.store
        .data
        .insert((persist::NAMESPACE.into(), Field::On.key().into()), vec![0xFF, 0xFF]);

    b.with(|app, now, ports| app.restore(now, ports));
    assert!(!b.app.is_on());
    assert!(!b
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::Restored { .. })));
}

#[test]
fn protocol_ready_announces_every_persisted_value() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    b.notifier.sent.clear();

    b.with(|app, now, ports| app.handle_command(AppCommand::ProtocolReady, now, ports))
        .unwrap();
    assert_eq!(
        b.notifier.sent,
        vec![
            (Characteristic::On, Value::Bool(true)),
            (Characteristic::WifiCheckInterval, Value::U8(10)),
        ]
    );
}

#[test]
fn out_of_range_interval_is_rejected() {
    let mut b = Bench::new();
    assert_eq!(
        write(&mut b, Characteristic::WifiCheckInterval, Value::U8(0)),
        Err(RemoteWriteError::OutOfRange(Characteristic::WifiCheckInterval))
    );
    assert_eq!(b.app.wifi_check_interval(), 10);
}

#[test]
fn identify_spawns_blink_job() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::Identify, Value::Bool(true)).unwrap();
    assert_eq!(b.tasks.spawned, vec![BackgroundJob::Identify { blinks: 3 }]);
    assert!(!b.app.restart_pending());
}

#[test]
fn finished_job_leaves_led_mirroring_latest_state() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::Identify, Value::Bool(true)).unwrap();
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    // The blink thread's last phase lands after the switch changed.
    b.hw.write_output(LED, true).unwrap();

    b.with(|app, _, ports| app.refresh_outputs(ports.output, ports.sink));
    assert_eq!(b.hw.level(LED), Some(false));
    assert_eq!(b.hw.level(RELAY), Some(true));
}

#[test]
fn ota_flushes_pending_saves_first() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    write(&mut b, Characteristic::OtaTrigger, Value::Bool(true)).unwrap();

    assert_eq!(b.store.writes_of(Field::On.key()), 1);
    assert_eq!(
        b.tasks.spawned,
        vec![BackgroundJob::OtaUpdate {
            beta: false,
            loader_beta: false
        }]
    );
}

#[test]
fn factory_reset_discards_pending_saves() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    write(&mut b, Characteristic::WifiReset, Value::Bool(true)).unwrap();
    b.run_for(5000);

    assert_eq!(b.tasks.spawned, vec![BackgroundJob::FactoryReset]);
    assert!(b.store.write_log.is_empty());
}

#[test]
fn changes_after_factory_reset_are_not_saved() {
    let mut b = Bench::with_config(PlugConfig {
        save_delay_ms: 500,
        ..Default::default()
    });
    write(&mut b, Characteristic::WifiReset, Value::Bool(true)).unwrap();
    b.run_for(100);

    // Reset job is erasing flash and restarts after restart_delay_ms.
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    write(&mut b, Characteristic::WifiCheckInterval, Value::U8(30)).unwrap();
    b.press(100);
    b.run_for(5000);

    assert!(b.app.restart_pending());
    assert!(b.store.write_log.is_empty());
    assert_eq!(b.app.save_scheduler().pending_count(), 0);
}

#[test]
fn spawn_failure_is_reported_and_not_latched() {
    let mut b = Bench::new();
    b.tasks.refuse = true;
    write(&mut b, Characteristic::WifiReset, Value::Bool(true)).unwrap();

    assert!(!b.app.restart_pending());
    assert!(!b.app.save_scheduler().is_frozen());
    assert!(b.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::JobFailed {
            error: SpawnError::ThreadCreateFailed,
            ..
        }
    )));
}

#[test]
fn save_failure_is_reported_not_retried() {
    let mut b = Bench::new();
    b.store.fail_writes = true;
    write(&mut b, Characteristic::On, Value::Bool(true)).unwrap();
    b.run_for(6000);

    let failures = b
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::SaveFailed { .. }))
        .count();
    assert_eq!(failures, 1);
    assert!(b.app.save_scheduler().pending(Field::On).is_none());
}

#[test]
fn wifi_check_follows_written_interval() {
    let mut b = Bench::new();
    write(&mut b, Characteristic::WifiCheckInterval, Value::U8(2)).unwrap();
    b.run_for(6000);

    let due = b
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::WifiCheckDue))
        .count();
    assert_eq!(due, 3);
}
