//! `critical-section` 1.x implementation for ESP-IDF builds.
//!
//! The embassy-sync channels in [`adapters::protocol`](crate::adapters::protocol)
//! lock through `critical-section`; on the device it is backed by a single
//! re-entrant std mutex shared by the protocol task, job threads and the
//! control loop. Host builds use the crate's own `std` implementation.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static CS_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CS_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CS_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CS_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // A panicking holder cannot leave `()` inconsistent.
            let lock = CS_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
            CS_GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        depth.set(d.saturating_add(1));
        d
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_restore: u8) {
    CS_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            CS_GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    });
}
