//! Button → gesture → action flows against the full [`AppService`].

use smartplug::app::characteristics::{Characteristic, Field, Value};
use smartplug::app::events::AppEvent;
use smartplug::app::jobs::BackgroundJob;
use smartplug::app::persist;
use smartplug::drivers::button::GestureKind;

use super::mock_hw::{Bench, LED, RELAY};

fn gestures(bench: &Bench) -> Vec<GestureKind> {
    bench
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Gesture { gesture, .. } => Some(gesture.kind),
            _ => None,
        })
        .collect()
}

#[test]
fn short_press_toggles_notifies_and_saves_once() {
    let mut b = Bench::new();
    assert_eq!(b.hw.level(RELAY), Some(false));
    // LED active-low: off = HIGH.
    assert_eq!(b.hw.level(LED), Some(true));

    b.press(150);
    let on_at = b.run_until(1000, |b| b.app.is_on()).expect("single press toggles");

    assert_eq!(gestures(&b), vec![GestureKind::Single]);
    assert_eq!(b.hw.level(RELAY), Some(true));
    assert_eq!(b.hw.level(LED), Some(false));
    assert_eq!(b.notifications_of(Characteristic::On), vec![Value::Bool(true)]);

    // Nothing written until the quiet period has passed.
    b.run_for(1990 - (b.now - on_at));
    assert_eq!(b.store.writes_of(Field::On.key()), 0);

    b.run_for(20);
    assert_eq!(b.store.writes_of(Field::On.key()), 1);
    assert_eq!(persist::load_field(&b.store, Field::On), Ok(Some(Value::Bool(true))));

    b.run_for(5000);
    assert_eq!(b.store.writes_of(Field::On.key()), 1);
}

#[test]
fn rapid_toggles_coalesce_into_one_write_of_final_value() {
    let mut b = Bench::new();
    for _ in 0..3 {
        b.press(100);
        b.run_for(800);
    }
    // Three toggles, each well inside the previous save delay.
    assert!(b.app.is_on());
    assert_eq!(b.store.writes_of(Field::On.key()), 0);

    b.run_for(2500);
    assert_eq!(b.store.writes_of(Field::On.key()), 1);
    assert_eq!(persist::load_field(&b.store, Field::On), Ok(Some(Value::Bool(true))));
}

#[test]
fn very_long_press_starts_factory_reset_without_saving() {
    let mut b = Bench::new();
    b.press(5000);
    b.run_for(3000);

    assert_eq!(gestures(&b), vec![GestureKind::VeryLong]);
    assert_eq!(b.tasks.spawned, vec![BackgroundJob::FactoryReset]);
    assert!(b.app.restart_pending());
    assert!(!b.app.is_on());
    assert_eq!(b.store.writes_of(Field::On.key()), 0);
}

#[test]
fn long_press_is_logged_only() {
    let mut b = Bench::new();
    b.press(1500);
    b.run_for(1000);

    assert_eq!(gestures(&b), vec![GestureKind::Long]);
    assert!(!b.app.is_on());
    assert!(b.tasks.spawned.is_empty());
    assert!(b.notifier.sent.is_empty());
}

#[test]
fn double_press_does_not_toggle() {
    let mut b = Bench::new();
    b.press(100);
    b.run_for(150);
    b.press(100);
    b.run_for(1000);

    assert_eq!(gestures(&b), vec![GestureKind::Double]);
    assert!(!b.app.is_on());
}

#[test]
fn bounce_shorter_than_debounce_is_ignored() {
    let mut b = Bench::new();
    for _ in 0..5 {
        b.press(10);
        b.run_for(10);
    }
    b.run_for(1000);
    assert!(gestures(&b).is_empty());
    assert!(!b.app.is_on());
}

#[test]
fn relay_fault_still_updates_state() {
    let mut b = Bench::new();
    b.hw.failing.insert(RELAY, -1);
    b.press(100);
    b.run_for(1000);

    assert!(b.app.is_on());
    assert!(b
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::OutputFault(f) if f.gpio == RELAY)));
    // LED is still driven.
    assert_eq!(b.hw.level(LED), Some(false));
}
