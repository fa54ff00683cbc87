//! Unified error taxonomy for the command-processing core.
//!
//! Every workflow step funnels its failures into [`Error`].  Nothing here
//! propagates past a workflow's `tick()`: the control loop is the top level,
//! so each variant is translated into a published result document, an
//! envelope reset, and user feedback at that boundary.

use core::fmt;

use crate::app::ports::{SensorError, StoreError};

// ---------------------------------------------------------------------------
// Core error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The remote store could not be read this tick.  No state change; the
    /// workflow retries on the next tick.
    Unreachable(StoreError),
    /// A write that the current step depends on was rejected.
    WriteFailed(StoreError),
    /// The command payload is malformed or missing a required field.
    Validation(&'static str),
    /// A payload slot id lies outside `0..=max`.
    OutOfRange { max: u16 },
    /// The slot pool has no identifier to give.
    ResourceExhausted,
    /// The biometric sensor returned a non-OK confirmation code.
    Sensor(SensorError),
    /// The remote actor set `Command/Cancelled`.
    Cancelled,
    /// A previous result has not been acknowledged by the remote actor.
    ResultOutstanding,
    /// The idempotent envelope reset failed on every attempt.
    ResetRetryExhausted { attempts: u8 },
}

impl Error {
    /// True for failures that only mean "cannot proceed this tick".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(e) => write!(f, "remote store unreachable: {e}"),
            Self::WriteFailed(e) => write!(f, "remote write failed: {e}"),
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::OutOfRange { max } => write!(f, "ID out of range (0-{max})"),
            Self::ResourceExhausted => write!(f, "No available fingerprint IDs"),
            Self::Sensor(e) => write!(f, "Error code: {}", e.code()),
            Self::Cancelled => write!(f, "cancelled by remote"),
            Self::ResultOutstanding => write!(f, "previous result not acknowledged"),
            Self::ResetRetryExhausted { attempts } => {
                write!(f, "command reset failed after {attempts} attempts")
            }
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
