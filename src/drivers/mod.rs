//! Input/output drivers, hardware initialisation, and peripheral helpers.

pub mod button;
pub mod debounce;
pub mod hw_init;
pub mod hw_timer;
pub mod task_pin;
pub mod watchdog;
