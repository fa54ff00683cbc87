//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (fingerprint sensor, display/buzzer, cloud store, clock,
//! event sinks, config storage) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them at call sites,
//! so the command engine never touches UART, HTTP or NVS directly.
//!
//! ## Error contract
//!
//! - **RemoteStorePort** distinguishes "path has no value" (`Ok(None)`) from
//!   "store could not be reached" (`Err`).  Workflows treat the latter as
//!   "cannot proceed this tick".
//! - **FingerprintPort** reports every non-OK confirmation byte as a raw
//!   [`SensorError`] code so it can be published for diagnostics.

use serde_json::Value;

use crate::config::SystemConfig;
use crate::feedback::Tone;
use crate::slots::SlotId;

// ───────────────────────────────────────────────────────────────
// Fingerprint port (driven adapter: sensor ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Outcome of an image capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// An image is held in the sensor's image buffer.
    Image,
    /// Nothing on the glass yet.  Not an error: the caller keeps polling.
    NoFinger,
}

/// The sensor's two feature buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharBuffer {
    One = 1,
    Two = 2,
}

/// Result of matching buffer 1 against the whole template library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchHit {
    Found { slot: SlotId, confidence: u16 },
    NotFound,
}

/// Whether a template is bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Occupied,
    Empty,
}

/// Opaque biometric capability.
///
/// Each call is a single request/response exchange with the sensor; none of
/// them wait for a finger.  A missing finger is reported as
/// [`Capture::NoFinger`] so the caller can yield and try again next tick.
pub trait FingerprintPort {
    /// Take one image from the glass.
    fn capture(&mut self) -> Result<Capture, SensorError>;

    /// Extract features from the image buffer into `buffer`.
    fn vectorize(&mut self, buffer: CharBuffer) -> Result<(), SensorError>;

    /// Merge both feature buffers into a template.
    fn combine(&mut self) -> Result<(), SensorError>;

    /// Search the library with the features in buffer 1.
    fn search(&mut self) -> Result<SearchHit, SensorError>;

    /// Store the merged template at `slot`.
    fn persist(&mut self, slot: SlotId) -> Result<(), SensorError>;

    /// Erase the template at `slot`.
    fn erase(&mut self, slot: SlotId) -> Result<(), SensorError>;

    /// Check whether `slot` holds a template.
    fn probe(&mut self, slot: SlotId) -> Result<Occupancy, SensorError>;

    /// Wipe the whole template library.
    fn erase_all(&mut self) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Feedback port (driven adapter: domain → display + buzzer)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget user feedback.  Never consulted for state.
pub trait FeedbackPort {
    /// Replace the display with up to three `lines` and optionally start a
    /// tone pattern.
    fn notify(&mut self, lines: &[&str], tone: Option<Tone>);
}

/// A board adapter that owns both the sensor and the feedback devices.
///
/// Passing one `&mut dyn Hardware` avoids a double mutable borrow when the
/// same adapter satisfies both ports.
pub trait Hardware: FingerprintPort + FeedbackPort {}

impl<T: FingerprintPort + FeedbackPort> Hardware for T {}

// ───────────────────────────────────────────────────────────────
// Remote store port (driven adapter: domain ↔ cloud database)
// ───────────────────────────────────────────────────────────────

/// Path-addressed JSON document store.
///
/// Paths are `/`-separated and absolute, e.g. `/FingerScanner1/Command/Status`.
pub trait RemoteStorePort {
    /// Whether the backend is connected and authenticated.
    fn is_ready(&self) -> bool;

    /// Read the value at `path`.  `Ok(None)` when the path holds nothing.
    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value at `path`.
    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: system timer + SNTP)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Milliseconds since boot.  Monotonic.
    fn uptime_ms(&self) -> u64;

    /// Wall-clock Unix seconds, or `None` before time is synchronised.
    fn unix_time(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting and reject
/// invalid ranges with [`ConfigError::ValidationFailed`] rather than clamp.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Raw non-OK confirmation code from the fingerprint sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorError(u8);

impl SensorError {
    /// Packet receive error reported by the module.
    pub const PACKET: Self = Self(0x01);
    /// No reply, or a reply that failed to decode.
    pub const TIMEOUT: Self = Self(0xFF);

    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u8 {
        self.0
    }
}

/// Errors from [`RemoteStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Not connected or not authenticated yet.
    NotReady,
    /// Connection failed or timed out mid-request.
    Transport,
    /// The server answered with a non-success status.
    Http(u16),
    /// The response body was not valid JSON.
    Decode,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sensor code 0x{:02X}", self.0)
    }
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotReady => write!(f, "store not ready"),
            Self::Transport => write!(f, "transport error"),
            Self::Http(status) => write!(f, "HTTP {status}"),
            Self::Decode => write!(f, "malformed response"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
