//! Task watchdog.
//!
//! Subscribes the control-loop task to the ESP-IDF TWDT so the terminal
//! reboots if the loop stalls, for example inside a hung HTTP exchange.
//! The loop calls [`Watchdog::feed`] once per iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Default stall limit.  Longer than one store round trip plus the
/// envelope reset backoff.
pub const DEFAULT_TIMEOUT_MS: u32 = 15_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: u64,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        // SAFETY: TWDT calls are made once from the main task during boot.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!("TWDT reconfigure returned {} (already running?)", ret);
            }

            let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
            if subscribed {
                info!("Watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
            } else {
                log::warn!("Watchdog: subscribe failed, loop stalls will go unnoticed");
            }
            Self {
                timeout_ms,
                subscribed,
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        info!("Watchdog(sim): {} ms, no-op", timeout_ms);
        Self {
            timeout_ms,
            feeds: 0,
        }
    }

    /// Reset the countdown.
    pub fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: plain register poke for the current task's TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.feeds += 1;
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}
