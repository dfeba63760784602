//! System configuration parameters
//!
//! All tunable timing parameters for the plug firmware.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlugConfig {
    // --- Button sampling ---
    /// Button line poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Raw level must be stable this long before an edge is accepted
    pub debounce_ms: u32,

    // --- Gesture thresholds ---
    /// Presses shorter than this are "short" (single / double candidates)
    pub short_press_max_ms: u32,
    /// Gap after a short release during which a second press makes a double
    pub double_press_window_ms: u32,
    /// Presses at least this long are "very long" (factory reset)
    pub long_press_max_ms: u32,

    // --- Persistence ---
    /// Quiet period before a changed field is written to flash
    pub save_delay_ms: u32,

    // --- Identify ---
    /// Number of LED blinks for the identify sequence
    pub identify_blinks: u8,
    pub identify_on_ms: u32,
    pub identify_off_ms: u32,

    // --- Maintenance ---
    /// Pause between reset/OTA hand-off and the restart
    pub restart_delay_ms: u32,
    /// Task watchdog timeout for the control loop
    pub watchdog_timeout_ms: u32,
    /// WiFi check interval used until a persisted value is restored (seconds)
    pub wifi_check_interval_secs: u8,
}

impl Default for PlugConfig {
    fn default() -> Self {
        Self {
            // Button sampling
            poll_interval_ms: 10, // 100 Hz
            debounce_ms: 30,

            // Gesture thresholds
            short_press_max_ms: 500,
            double_press_window_ms: 400,
            long_press_max_ms: 4000,

            // Persistence
            save_delay_ms: 2000,

            // Identify
            identify_blinks: 3,
            identify_on_ms: 100,
            identify_off_ms: 100,

            // Maintenance
            restart_delay_ms: 1000,
            watchdog_timeout_ms: 10_000,
            wifi_check_interval_secs: 10,
        }
    }
}
