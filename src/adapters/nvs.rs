//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the [`SystemConfig`] is stored as a single
//! postcard blob under `biomark::syscfg`.  Every field is range-checked
//! before it is written.  On host targets an in-memory map stands in for
//! the flash partition.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg_attr(target_os = "espidf", allow(dead_code))]
const CONFIG_NAMESPACE: &str = "biomark";
#[cfg_attr(target_os = "espidf", allow(dead_code))]
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE_C: &[u8] = b"biomark\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"syscfg\0";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Open the config namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        // SAFETY: the namespace literal is NUL-terminated.
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE_C.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

pub(crate) fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.device_root.is_empty() || cfg.device_root.contains('/') {
        return Err(ConfigError::ValidationFailed(
            "device_root must be non-empty and contain no '/'",
        ));
    }
    if !cfg.database_url.is_empty() && !cfg.database_url.starts_with("https://") {
        return Err(ConfigError::ValidationFailed("database_url must start with https://"));
    }
    if !(1..=1000).contains(&cfg.slot_capacity) {
        return Err(ConfigError::ValidationFailed("slot_capacity must be 1-1000"));
    }
    if !(10..=1000).contains(&cfg.loop_interval_ms) {
        return Err(ConfigError::ValidationFailed("loop_interval_ms must be 10-1000"));
    }
    if cfg.command_poll_interval_ms < cfg.loop_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "command_poll_interval_ms must be >= loop_interval_ms",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.heartbeat_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "heartbeat_interval_ms must be 1000-3600000",
        ));
    }
    if !(1..=10).contains(&cfg.reset_attempts) {
        return Err(ConfigError::ValidationFailed("reset_attempts must be 1-10"));
    }
    if cfg.reset_backoff_ms > 5_000 {
        return Err(ConfigError::ValidationFailed("reset_backoff_ms must be <= 5000"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(&Self::composite_key()) {
                Some(bytes) => {
                    let cfg = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from store");
                    Ok(cfg)
                }
                None => Err(ConfigError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_handle(false, |handle| {
                let mut size: usize = 0;
                // First call: size only.
                let ret = unsafe {
                    nvs_get_blob(handle, CONFIG_KEY_C.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_ERR_NVS_INVALID_LENGTH);
                }
                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(handle, CONFIG_KEY_C.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound),
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().insert(Self::composite_key(), bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(handle, CONFIG_KEY_C.as_ptr().cast(), bytes.as_ptr().cast(), bytes.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    rc => Err(rc),
                }
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(ConfigError::StorageFull),
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
