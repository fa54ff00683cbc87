//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                    |
//! |------------|-------------------|--------------------------------|
//! | `hardware` | FingerprintPort   | AS608 over UART2               |
//! |            | FeedbackPort      | Buzzer (LEDC) + OLED panel     |
//! | `log_sink` | EventSink         | Serial log output              |
//! | `nvs`      | ConfigPort        | NVS / in-memory store          |
//! | `rtdb`     | RemoteStorePort   | Firebase RTDB REST / in-memory |
//! | `time`     | ClockPort         | ESP32 system timer + SNTP      |
//! | `wifi`     | ConnectivityPort  | ESP-IDF WiFi STA               |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod rtdb;
pub mod time;
pub mod wifi;
