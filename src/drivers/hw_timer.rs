//! Button poll timer using ESP-IDF's esp_timer API.
//!
//! A single periodic timer pushes [`Event::ButtonPollTick`] at the
//! configured poll interval. The callback runs in the esp_timer task
//! context (not ISR), so it can safely call `push_event()`.
//!
//! On simulation targets the control loop pushes the tick itself.

use crate::events::{push_event, Event};

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
static mut POLL_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn poll_tick_cb(_arg: *mut core::ffi::c_void) {
    on_poll_tick();
}

fn on_poll_tick() {
    push_event(Event::ButtonPollTick);
}

/// Start the periodic button poll timer. Failure is fatal at boot: without
/// it the button is dead.
#[cfg(target_os = "espidf")]
pub fn start_poll_timer(interval_ms: u32) -> Result<(), HwInitError> {
    let args = esp_timer_create_args_t {
        callback: Some(poll_tick_cb),
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: c"btn-poll".as_ptr(),
        skip_unhandled_events: true,
    };
    // SAFETY: POLL_TIMER is written here once at boot from the main task
    // before the timer can fire; the callback only touches the atomic
    // event set.
    unsafe {
        let ret = esp_timer_create(&args, &raw mut POLL_TIMER);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerFailed(ret));
        }
        let ret = esp_timer_start_periodic(POLL_TIMER, u64::from(interval_ms) * 1000);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerFailed(ret));
        }
    }
    log::info!("hw_timer: button poll every {} ms", interval_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_poll_timer(interval_ms: u32) -> Result<(), HwInitError> {
    if interval_ms == 0 {
        return Err(HwInitError::TimerFailed(0x102));
    }
    log::info!("hw_timer(sim): poll ticks driven by the loop ({} ms)", interval_ms);
    Ok(())
}

/// Push one poll tick by hand (simulation loop and tests).
#[cfg(not(target_os = "espidf"))]
pub fn sim_tick() {
    on_poll_tick();
}

/// Stop the poll timer (before a restart).
#[cfg(target_os = "espidf")]
pub fn stop_poll_timer() {
    // SAFETY: null-check guards against a timer that never started.
    unsafe {
        let t = POLL_TIMER;
        if !t.is_null() {
            esp_timer_stop(t);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_poll_timer() {}
