//! GPIO / peripheral pin assignments for the BioMark terminal board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Fingerprint sensor (AS608 / R307 on UART2)
// ---------------------------------------------------------------------------

/// ESP32 RX, wired to the sensor's TX line.
pub const FINGERPRINT_RX_GPIO: i32 = 16;
/// ESP32 TX, wired to the sensor's RX line.
pub const FINGERPRINT_TX_GPIO: i32 = 17;
/// Factory default baud rate of the module.
pub const FINGERPRINT_BAUD: u32 = 57_600;
/// UART port used for the sensor.
pub const FINGERPRINT_UART: i32 = 2;

// ---------------------------------------------------------------------------
// Buzzer (passive piezo on LEDC)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 4;
