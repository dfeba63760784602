//! One-shot GPIO initialization plus the raw pin accessors.
//!
//! Configures the relay and LED as push-pull outputs and the button as an
//! input with the pull resistor from the board profile, using raw ESP-IDF
//! sys calls. Called once from `main()` before the control loop starts;
//! any failure aborts startup.
//!
//! On the host, pin levels live in a simulated register so the adapters
//! and integration tests exercise the same code path.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::pins::{BoardProfile, Pull};

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { gpio: i32, rc: i32 },
    InvalidPin(i32),
    TimerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { gpio, rc } => {
                write!(f, "GPIO{} config failed (rc={})", gpio, rc)
            }
            Self::InvalidPin(gpio) => write!(f, "GPIO{} is not a valid pin", gpio),
            Self::TimerFailed(rc) => write!(f, "poll timer start failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// Highest GPIO number on the target.
const MAX_GPIO: i32 = 39;

fn check_pin(gpio: i32) -> Result<(), HwInitError> {
    if (0..=MAX_GPIO).contains(&gpio) {
        Ok(())
    } else {
        Err(HwInitError::InvalidPin(gpio))
    }
}

/// Configure every line of `board`. Outputs are left at their inactive
/// level; the controller drives the real state right after.
pub fn init_peripherals(board: &BoardProfile) -> Result<(), HwInitError> {
    for out in board.outputs() {
        check_pin(out.gpio)?;
        init_output(out.gpio)?;
        gpio_write(out.gpio, out.active.level_for(false)).map_err(|rc| {
            HwInitError::GpioConfigFailed { gpio: out.gpio, rc }
        })?;
    }
    check_pin(board.button.gpio)?;
    init_input(board.button.gpio, board.button.pull)?;

    info!(
        "hw_init: {} configured (relay=GPIO{}, led=GPIO{}, button=GPIO{})",
        board.name, board.relay.gpio, board.led.gpio, board.button.gpio
    );
    Ok(())
}

// ── ESP-IDF implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_output(gpio: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the control loop; single-threaded.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { gpio, rc: ret });
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn init_input(gpio: i32, pull: Pull) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if pull == Pull::Up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: if pull == Pull::Down {
            gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
        } else {
            gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
        },
        // Polled from the button timer; no edge interrupt.
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the control loop; single-threaded.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { gpio, rc: ret });
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Drive `pin`; returns the driver's error code on failure.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level writes to an output configured in init_output().
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU64, Ordering};

    /// One bit per GPIO, set = HIGH. Inputs idle high (pull-ups).
    pub static LEVELS: AtomicU64 = AtomicU64::new(u64::MAX);

    pub fn set(pin: i32, high: bool) {
        let bit = 1u64 << pin;
        if high {
            LEVELS.fetch_or(bit, Ordering::AcqRel);
        } else {
            LEVELS.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    pub fn get(pin: i32) -> bool {
        LEVELS.load(Ordering::Acquire) & (1u64 << pin) != 0
    }
}

#[cfg(not(target_os = "espidf"))]
fn init_output(gpio: i32) -> Result<(), HwInitError> {
    log::debug!("hw_init(sim): GPIO{} output", gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_input(gpio: i32, pull: Pull) -> Result<(), HwInitError> {
    sim::set(gpio, pull != Pull::Down);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    (0..=MAX_GPIO).contains(&pin) && sim::get(pin)
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    if !(0..=MAX_GPIO).contains(&pin) {
        // ESP_ERR_INVALID_ARG
        return Err(0x102);
    }
    sim::set(pin, high);
    Ok(())
}

/// Force a simulated input level (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_input(pin: i32, high: bool) {
    sim::set(pin, high);
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::pins::SONOFF_BASIC;

    #[test]
    fn init_leaves_outputs_inactive() {
        init_peripherals(&SONOFF_BASIC).unwrap();
        // Relay active-high → LOW; LED active-low → HIGH.
        assert!(!gpio_read(SONOFF_BASIC.relay.gpio));
        assert!(gpio_read(SONOFF_BASIC.led.gpio));
        // Pull-up button idles HIGH.
        assert!(gpio_read(SONOFF_BASIC.button.gpio));
    }

    #[test]
    fn invalid_pin_is_rejected() {
        let mut board = SONOFF_BASIC;
        board.relay.gpio = 48;
        assert_eq!(init_peripherals(&board), Err(HwInitError::InvalidPin(48)));
        assert_eq!(gpio_write(-1, true), Err(0x102));
    }
}
