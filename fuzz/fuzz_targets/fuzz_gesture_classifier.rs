//! Fuzz target: debounce + gesture classification.
//!
//! Each input byte is one sample: the low bit is the raw button level and
//! the remaining bits are the time advance in milliseconds. Asserts the
//! pipeline never panics, emits at most one gesture per sample, and comes
//! back to idle once the button has been released long enough.
//!
//! cargo fuzz run fuzz_gesture_classifier

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartplug::config::PlugConfig;
use smartplug::drivers::button::ButtonDriver;
use smartplug::pins::SONOFF_BASIC;

fuzz_target!(|data: &[u8]| {
    let cfg = PlugConfig::default();
    let mut driver = ButtonDriver::new(SONOFF_BASIC.button, &cfg);
    // Start near the wrap point so wrapping arithmetic is exercised.
    let mut now: u32 = u32::MAX - 5_000;

    for &b in data {
        now = now.wrapping_add(u32::from(b >> 1));
        let _ = driver.tick(b & 1 == 1, now);
    }

    // Released (HIGH) long enough for every pending timeout to expire.
    let mut gestures = 0;
    for _ in 0..200 {
        now = now.wrapping_add(cfg.poll_interval_ms);
        if driver.tick(true, now).is_some() {
            gestures += 1;
        }
    }
    assert!(gestures <= 2, "at most a pending and a resolved gesture remain");
    assert!(!driver.is_pressed());
});
