//! Reset / OTA collaborator.
//!
//! Factory reset erases the WiFi station config, the protocol server's
//! pairing records and the persisted plug fields. OTA arming writes the
//! request flags into the `ota` namespace, where the updater picks them up
//! on the next boot. Both end in [`MaintenancePort::restart`].

use log::{info, warn};

use crate::app::persist;
use crate::app::ports::{MaintenancePort, StoragePort};
use crate::drivers::hw_timer;

use super::nvs::NvsAdapter;

/// Namespace the ESP-IDF WiFi driver keeps station credentials in.
pub const WIFI_NAMESPACE: &str = "nvs.net80211";
/// Namespace the protocol server keeps controller pairings in.
pub const PAIRING_NAMESPACE: &str = "pairing";
/// Namespace read by the OTA updater at boot.
pub const OTA_NAMESPACE: &str = "ota";

pub const OTA_REQUESTED_KEY: &str = "requested";
pub const OTA_BETA_KEY: &str = "beta";
pub const OTA_LCM_BETA_KEY: &str = "lcm_beta";

#[cfg(not(target_os = "espidf"))]
static SIM_RESTARTS: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

/// Number of simulated restarts so far.
#[cfg(not(target_os = "espidf"))]
pub fn sim_restart_count() -> u32 {
    SIM_RESTARTS.load(std::sync::atomic::Ordering::SeqCst)
}

pub struct EspMaintenance {
    nvs: NvsAdapter,
}

impl EspMaintenance {
    pub fn new() -> Self {
        Self::with_store(NvsAdapter::handle())
    }

    pub fn with_store(nvs: NvsAdapter) -> Self {
        Self { nvs }
    }

    pub fn store(&self) -> &NvsAdapter {
        &self.nvs
    }
}

impl Default for EspMaintenance {
    fn default() -> Self {
        Self::new()
    }
}

impl MaintenancePort for EspMaintenance {
    fn reset_configuration(&mut self) {
        for ns in [WIFI_NAMESPACE, PAIRING_NAMESPACE] {
            match self.nvs.erase_namespace(ns) {
                Ok(()) => info!("Maintenance: erased '{}'", ns),
                Err(e) => warn!("Maintenance: erase '{}' failed: {:?}", ns, e),
            }
        }
        if let Err(e) = persist::erase_fields(&mut self.nvs) {
            warn!("Maintenance: clearing plug fields failed: {:?}", e);
        }
    }

    fn request_ota_update(&mut self, beta: bool, loader_beta: bool) {
        let writes = [
            (OTA_BETA_KEY, beta),
            (OTA_LCM_BETA_KEY, loader_beta),
            (OTA_REQUESTED_KEY, true),
        ];
        for (key, flag) in writes {
            if let Err(e) = self.nvs.write(OTA_NAMESPACE, key, &[u8::from(flag)]) {
                warn!("Maintenance: OTA flag '{}' not stored: {:?}", key, e);
                return;
            }
        }
        info!("Maintenance: OTA armed (beta={}, loader_beta={})", beta, loader_beta);
    }

    fn restart(&mut self) {
        hw_timer::stop_poll_timer();
        info!("Maintenance: restarting");

        #[cfg(target_os = "espidf")]
        // SAFETY: esp_restart never returns; no Rust state outlives it.
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }

        #[cfg(not(target_os = "espidf"))]
        SIM_RESTARTS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
