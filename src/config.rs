//! System configuration parameters
//!
//! All tunable parameters for the BioMark terminal.
//! Values can be overridden via NVS (non-volatile storage).

use heapless::String;
use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Network ---
    /// Station SSID (empty = not provisioned).
    pub wifi_ssid: String<32>,
    /// WPA2 passphrase (empty for open networks).
    pub wifi_password: String<64>,

    // --- Remote store ---
    /// Node under which this device's documents live (no slashes).
    pub device_root: String<32>,
    /// Realtime database base URL, e.g. `https://example.firebaseio.com`.
    pub database_url: String<128>,
    /// Database secret or ID token appended as `?auth=`.
    pub auth_token: String<192>,

    // --- Sensor ---
    /// Number of template slots on the fingerprint module.
    pub slot_capacity: u16,

    // --- Timing ---
    /// Minimum spacing between envelope polls (milliseconds)
    pub command_poll_interval_ms: u32,
    /// Liveness write interval (milliseconds)
    pub heartbeat_interval_ms: u32,
    /// Control loop period (milliseconds)
    pub loop_interval_ms: u32,

    // --- Envelope reset ---
    /// Attempts before a reset is abandoned
    pub reset_attempts: u8,
    /// Wait between reset attempts (milliseconds)
    pub reset_backoff_ms: u32,

    // --- Attendance ---
    /// How long a pending entry may wait for resolution (seconds, 0 = forever)
    pub attendance_entry_timeout_secs: u32,
}

impl SystemConfig {
    /// Largest valid slot id.
    pub fn max_slot(&self) -> u16 {
        self.slot_capacity.saturating_sub(1)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_root = String::new();
        // "FingerScanner1" always fits in 32 bytes.
        let _ = device_root.push_str("FingerScanner1");

        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),

            device_root,
            database_url: String::new(),
            auth_token: String::new(),

            // AS608 / R307 library size
            slot_capacity: 300,

            // Timing
            command_poll_interval_ms: 500,
            heartbeat_interval_ms: 20_000,
            loop_interval_ms: 50,

            // Envelope reset
            reset_attempts: 3,
            reset_backoff_ms: 200,

            // Attendance
            attendance_entry_timeout_secs: 120,
        }
    }
}
