//! Peripheral drivers: fingerprint module, buzzer, text panel, watchdog.

pub mod as608;
pub mod buzzer;
pub mod display;
pub mod fingerprint;
pub mod hw_init;
pub mod transport;
pub mod watchdog;
