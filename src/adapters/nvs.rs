//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the plug.
//!
//! - Config validation: every field is range-checked before persistence;
//!   out-of-range values are rejected, never clamped.
//! - Namespace isolation: timing config, persisted fields and pairing data
//!   live in separate namespaces.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//!
//! On non-espidf targets the backend is an in-memory map.

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::PlugConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

const CONFIG_NAMESPACE: &str = "plugcfg";
const CONFIG_KEY: &str = "timing";

/// Largest config blob accepted from flash.
const MAX_CONFIG_BLOB: usize = 128;

#[cfg(target_os = "espidf")]
const NVS_NOT_FOUND: i32 = ESP_ERR_NVS_NOT_FOUND as i32;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash and return an adapter.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised automatically. Returns
    /// `Err(ConfigError::IoError)` if that fails too.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // main task before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self::handle())
    }

    /// Additional handle on an already-initialised partition (background
    /// jobs). On the host this is a fresh, empty store.
    pub fn handle() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Null-terminated copy of an NVS name (max 15 chars).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is null-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used afterwards.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Erase every key in `namespace`.
    #[cfg(target_os = "espidf")]
    pub fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: handle is open read-write.
            let ret = unsafe { nvs_erase_all(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            // SAFETY: as above.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => Ok(()),
            // Namespace never created: nothing to erase.
            Err(e) if e == NVS_NOT_FOUND => Ok(()),
            Err(_) => Err(StorageError::IoError),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let prefix = format!("{}::", namespace);
        self.store
            .borrow_mut()
            .retain(|k: &String, _: &mut Vec<u8>| !k.starts_with(&prefix));
        Ok(())
    }
}

pub fn validate_config(cfg: &PlugConfig) -> Result<(), ConfigError> {
    if !(1..=100).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed("poll_interval_ms must be 1–100"));
    }
    if cfg.debounce_ms < cfg.poll_interval_ms || cfg.debounce_ms > 200 {
        return Err(ConfigError::ValidationFailed(
            "debounce_ms must be poll_interval_ms–200",
        ));
    }
    if cfg.short_press_max_ms <= cfg.debounce_ms {
        return Err(ConfigError::ValidationFailed(
            "short_press_max_ms must exceed debounce_ms",
        ));
    }
    if cfg.long_press_max_ms <= cfg.short_press_max_ms || cfg.long_press_max_ms > 30_000 {
        return Err(ConfigError::ValidationFailed(
            "long_press_max_ms must be > short_press_max_ms and ≤ 30000",
        ));
    }
    if !(50..=2000).contains(&cfg.double_press_window_ms) {
        return Err(ConfigError::ValidationFailed(
            "double_press_window_ms must be 50–2000",
        ));
    }
    if !(100..=60_000).contains(&cfg.save_delay_ms) {
        return Err(ConfigError::ValidationFailed("save_delay_ms must be 100–60000"));
    }
    if cfg.identify_blinks == 0 || cfg.identify_blinks > 20 {
        return Err(ConfigError::ValidationFailed("identify_blinks must be 1–20"));
    }
    if cfg.identify_on_ms == 0 || cfg.identify_off_ms == 0 {
        return Err(ConfigError::ValidationFailed("identify timings must be non-zero"));
    }
    if cfg.watchdog_timeout_ms <= cfg.restart_delay_ms {
        return Err(ConfigError::ValidationFailed(
            "watchdog_timeout_ms must exceed restart_delay_ms",
        ));
    }
    if cfg.wifi_check_interval_secs == 0 {
        return Err(ConfigError::ValidationFailed(
            "wifi_check_interval_secs must be 1–255",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<PlugConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: PlugConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(PlugConfig::default())
            }
            Err(_) => Err(ConfigError::IoError),
        }
    }

    fn save(&self, config: &PlugConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        let bytes = postcard::to_slice(config, &mut buf).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl NvsAdapter {
    /// Shared write path for `&self` (config) and `&mut self` (storage).
    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let c_key = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: key is null-terminated; data pointer/len describe a live slice.
            let ret = unsafe {
                nvs_set_blob(handle, c_key.as_ptr().cast(), data.as_ptr().cast(), data.len())
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            // SAFETY: handle is open read-write.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsAdapter: write {}::{} failed ({})", namespace, key, e);
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
                StorageError::Full
            } else {
                StorageError::IoError
            }
        })
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) if data.len() > buf.len() => Err(StorageError::Corrupted),
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size = buf.len();
                // SAFETY: `size` is the capacity of `buf`; NVS writes at most that.
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH as i32 => Err(StorageError::Corrupted),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: key is null-terminated; handle is open read-write.
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
                if ret != ESP_OK as i32 && ret != NVS_NOT_FOUND {
                    return Err(ret);
                }
                // SAFETY: as above.
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => Ok(()),
                Err(e) if e == NVS_NOT_FOUND => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .contains_key(&Self::composite_key(namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size: usize = 0;
                // SAFETY: a null out-pointer asks NVS for the blob length only.
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                Ok(ret == ESP_OK as i32)
            });
            result.unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(cfg: PlugConfig) -> bool {
        matches!(validate_config(&cfg), Err(ConfigError::ValidationFailed(_)))
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(validate_config(&PlugConfig::default()).is_ok());
    }

    #[test]
    fn rejects_debounce_shorter_than_poll() {
        assert!(invalid(PlugConfig {
            poll_interval_ms: 20,
            debounce_ms: 10,
            ..Default::default()
        }));
    }

    #[test]
    fn rejects_inverted_press_thresholds() {
        assert!(invalid(PlugConfig {
            short_press_max_ms: 5000,
            long_press_max_ms: 4000,
            ..Default::default()
        }));
    }

    #[test]
    fn rejects_zero_wifi_interval() {
        assert!(invalid(PlugConfig {
            wifi_check_interval_secs: 0,
            ..Default::default()
        }));
    }

    #[test]
    fn invalid_config_is_not_persisted() {
        let nvs = NvsAdapter::new().unwrap();
        let bad = PlugConfig {
            identify_blinks: 0,
            ..Default::default()
        };
        assert!(nvs.save(&bad).is_err());
        assert_eq!(nvs.load().unwrap(), PlugConfig::default());
    }

    #[test]
    fn config_round_trip() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = PlugConfig {
            save_delay_ms: 5000,
            ..Default::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn corrupt_config_blob_is_reported() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 4]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn storage_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("plug", "on", &[1, 1]).unwrap();
        assert!(nvs.exists("plug", "on"));

        let mut buf = [0u8; 8];
        let len = nvs.read("plug", "on", &mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 1]);

        nvs.delete("plug", "on").unwrap();
        assert!(!nvs.exists("plug", "on"));
        assert_eq!(nvs.read("plug", "on", &mut buf), Err(StorageError::NotFound));
    }

    #[test]
    fn erase_namespace_is_isolated() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("pairing", "ltpk", b"alpha").unwrap();
        nvs.write("plug", "on", b"bravo").unwrap();
        nvs.erase_namespace("pairing").unwrap();
        assert!(!nvs.exists("pairing", "ltpk"));
        assert!(nvs.exists("plug", "on"));
    }
}
