//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the BioMark terminal.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`,
//!   wall-clock time from `gettimeofday()` once SNTP has set it.  Call
//!   [`Esp32TimeAdapter::start_sync`] after the network is up.
//! - **`not(target_os = "espidf")`**: `std::time` for host-side testing and
//!   simulation.

use crate::app::ports::ClockPort;

/// Anything earlier than 2020-01-01 means SNTP has not run yet.
const EPOCH_2020: u64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Start background SNTP against the default pool.  Wall-clock reads
    /// stay `None` until the first response lands.
    #[cfg(target_os = "espidf")]
    pub fn start_sync(&mut self) -> Result<(), esp_idf_svc::sys::EspError> {
        if self.sntp.is_none() {
            self.sntp = Some(esp_idf_svc::sntp::EspSntp::new_default()?);
            log::info!("SNTP: sync started");
        }
        Ok(())
    }

    /// Host clocks are already set.
    #[cfg(not(target_os = "espidf"))]
    pub fn start_sync(&mut self) -> Result<(), core::convert::Infallible> {
        Ok(())
    }

    /// `true` once the wall clock holds a plausible date.
    pub fn is_synced(&self) -> bool {
        self.unix_time().is_some()
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn wall_clock_secs(&self) -> Option<u64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        u64::try_from(tv.tv_sec).ok()
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_clock_secs(&self) -> Option<u64> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs())
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    fn unix_time(&self) -> Option<u64> {
        self.wall_clock_secs().filter(|&secs| secs >= EPOCH_2020)
    }
}
