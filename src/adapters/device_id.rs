//! Accessory identity derived from the factory MAC address.
//!
//! The serial number has the form `SP-XXYYZZ` (last 3 bytes of the 6-byte
//! MAC in uppercase hex). It is deterministic across reboots and is what
//! the protocol server publishes in the accessory-information service,
//! alongside the fixed name/manufacturer/model and the firmware revision.

use core::fmt::Write;

/// Short serial string: "SP-XXYYZZ".
pub type SerialString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

pub const DEVICE_NAME: &str = "Sonoff";
pub const MANUFACTURER: &str = "itead";
pub const MODEL: &str = "Basic";

/// Static accessory-information values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial: SerialString,
    pub firmware_revision: &'static str,
}

impl AccessoryInfo {
    pub fn from_mac(mac: &MacAddress) -> Self {
        Self {
            name: DEVICE_NAME,
            manufacturer: MANUFACTURER,
            model: MODEL,
            serial: serial_number(mac),
            firmware_revision: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the API writes.
    let ret = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("eFuse MAC read failed ({}), serial will be SP-000000", ret);
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the serial number from the last 3 MAC bytes.
pub fn serial_number(mac: &MacAddress) -> SerialString {
    let mut id = SerialString::new();
    let _ = write!(id, "SP-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}
