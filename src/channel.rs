//! Remote command channel.
//!
//! Typed access to the device's node in the cloud database:
//!
//! ```text
//! /<root>
//!   ├── Last_Seen
//!   ├── Command/{Type, Status, Cancelled, Data, Result}
//!   ├── Enrollment_Result
//!   ├── Deletion_Result
//!   └── Attendance_Record/{Class, Section, Start_Time, End_Time, Students/…}
//! ```
//!
//! Reads that fail map to [`Error::Unreachable`] (try again next tick);
//! writes that fail map to [`Error::WriteFailed`].  The channel borrows its
//! collaborators for one control-loop tick and holds no state of its own.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};
use serde_json::{Value, json};

use crate::app::ports::RemoteStorePort;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Paths (relative to the device root)
// ---------------------------------------------------------------------------

pub const COMMAND: &str = "Command";
pub const COMMAND_STATUS: &str = "Command/Status";
pub const COMMAND_TYPE: &str = "Command/Type";
pub const COMMAND_CANCELLED: &str = "Command/Cancelled";
pub const COMMAND_DATA: &str = "Command/Data";
pub const COMMAND_RESULT: &str = "Command/Result";
pub const LAST_SEEN: &str = "Last_Seen";

/// Value of `Command/Result` when no acknowledgement is outstanding.
pub const RESULT_NONE: &str = "none";
/// Marker: an `Enrollment_Result` is still waiting to be consumed.
pub const RESULT_NOT_SAVED: &str = "Previous_Result_Not_Saved";
/// Marker: the command payload lacked a required field.
pub const RESULT_DATA_NOT_FOUND: &str = "Data_Not_Found";

// ---------------------------------------------------------------------------
// Envelope vocabulary
// ---------------------------------------------------------------------------

/// `Command/Status` as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Idle,
    Pending,
    Processing,
}

impl CommandStatus {
    /// Anything other than `pending` / `processing` counts as idle.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("pending") => Self::Pending,
            Some("processing") => Self::Processing,
            _ => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Processing => "processing",
        }
    }
}

/// `Command/Type` as requested by the remote actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    None,
    Enroll,
    Delete,
    Attendance,
    /// Anything the firmware does not recognise, kept for logging.
    Unknown(String),
}

impl CommandType {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::None,
            Some(Value::String(s)) => match s.as_str() {
                "none" | "" => Self::None,
                "enroll" => Self::Enroll,
                "delete" => Self::Delete,
                "attendance" => Self::Attendance,
                other => Self::Unknown(other.into()),
            },
            Some(other) => Self::Unknown(other.to_string()),
        }
    }
}

/// Result documents the device publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDoc {
    Enrollment,
    Deletion,
    Attendance,
}

impl ResultDoc {
    pub fn path(self) -> &'static str {
        match self {
            Self::Enrollment => "Enrollment_Result",
            Self::Deletion => "Deletion_Result",
            Self::Attendance => "Attendance_Record",
        }
    }
}

// ---------------------------------------------------------------------------
// CommandChannel
// ---------------------------------------------------------------------------

pub struct CommandChannel<'a> {
    store: &'a mut dyn RemoteStorePort,
    delay: &'a mut dyn DelayNs,
    root: &'a str,
    reset_attempts: u8,
    reset_backoff_ms: u32,
}

impl<'a> CommandChannel<'a> {
    pub fn new(
        store: &'a mut dyn RemoteStorePort,
        delay: &'a mut dyn DelayNs,
        root: &'a str,
    ) -> Self {
        Self {
            store,
            delay,
            root,
            reset_attempts: 3,
            reset_backoff_ms: 200,
        }
    }

    /// Override the envelope reset retry policy.
    pub fn with_reset_policy(mut self, attempts: u8, backoff_ms: u32) -> Self {
        self.reset_attempts = attempts.max(1);
        self.reset_backoff_ms = backoff_ms;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    /// Absolute store path for `rel`.
    pub fn path(&self, rel: &str) -> String {
        if rel.is_empty() {
            format!("/{}", self.root)
        } else {
            format!("/{}/{}", self.root, rel)
        }
    }

    // ── Raw access ────────────────────────────────────────────

    pub fn read(&mut self, rel: &str) -> Result<Option<Value>> {
        let path = self.path(rel);
        self.store.get(&path).map_err(Error::Unreachable)
    }

    pub fn write(&mut self, rel: &str, value: &Value) -> Result<()> {
        let path = self.path(rel);
        self.store.set(&path, value).map_err(|e| {
            warn!("write {} failed: {}", path, e);
            Error::WriteFailed(e)
        })
    }

    // ── Envelope reads ────────────────────────────────────────

    pub fn peek_status(&mut self) -> Result<CommandStatus> {
        let v = self.read(COMMAND_STATUS)?;
        Ok(CommandStatus::from_value(v.as_ref()))
    }

    pub fn peek_type(&mut self) -> Result<CommandType> {
        let v = self.read(COMMAND_TYPE)?;
        Ok(CommandType::from_value(v.as_ref()))
    }

    /// A missing flag reads as `false`.
    pub fn peek_cancelled(&mut self) -> Result<bool> {
        Ok(match self.read(COMMAND_CANCELLED)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        })
    }

    /// `Command/Result`, or `"none"` when the field is absent.
    pub fn peek_result(&mut self) -> Result<String> {
        Ok(match self.read(COMMAND_RESULT)? {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => RESULT_NONE.into(),
            Some(other) => other.to_string(),
        })
    }

    /// Read `Command/Data/<field>`.
    pub fn read_field(&mut self, field: &str) -> Result<Option<Value>> {
        let rel = format!("{COMMAND_DATA}/{field}");
        self.read(&rel)
    }

    /// Payload field as text.  Numbers are accepted and rendered.
    pub fn read_string(&mut self, field: &str) -> Result<Option<String>> {
        Ok(match self.read_field(field)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Payload field as an integer.  Numeric strings are accepted.
    pub fn read_int(&mut self, field: &str) -> Result<Option<i64>> {
        Ok(match self.read_field(field)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn result_exists(&mut self, doc: ResultDoc) -> Result<bool> {
        Ok(!matches!(self.read(doc.path())?, None | Some(Value::Null)))
    }

    // ── Envelope writes ───────────────────────────────────────

    /// Take exclusive ownership of the pending command.
    pub fn claim(&mut self) -> Result<()> {
        self.write(COMMAND_STATUS, &json!(CommandStatus::Processing.as_str()))
    }

    /// Set the `Command/Result` marker.
    pub fn set_result(&mut self, marker: &str) -> Result<()> {
        self.write(COMMAND_RESULT, &json!(marker))
    }

    pub fn publish(&mut self, doc: ResultDoc, body: &Value) -> Result<()> {
        info!("publish {} {}", doc.path(), body);
        self.write(doc.path(), body)
    }

    /// Return the envelope to idle so the next command can be claimed.
    ///
    /// Best effort: each attempt writes all four fields and the whole set is
    /// retried after a short wait if any of them fails.  `Command/Result`
    /// belongs to the remote actor and is left alone.  An offline store
    /// fails immediately with no attempts made.
    pub fn reset_to_idle(&mut self) -> Result<()> {
        if !self.store.is_ready() {
            warn!("envelope reset skipped: store not ready");
            return Err(Error::ResetRetryExhausted { attempts: 0 });
        }

        let fields = [
            (COMMAND_TYPE, json!("none")),
            (COMMAND_STATUS, json!(CommandStatus::Idle.as_str())),
            (COMMAND_CANCELLED, json!(false)),
            (COMMAND_DATA, json!({})),
        ];

        for attempt in 1..=self.reset_attempts {
            let mut ok = true;
            for (rel, value) in &fields {
                ok &= self.write(rel, value).is_ok();
            }
            if ok {
                info!("Command envelope reset to idle");
                return Ok(());
            }
            warn!("envelope reset attempt {}/{} failed", attempt, self.reset_attempts);
            if attempt < self.reset_attempts {
                self.delay.delay_ms(self.reset_backoff_ms);
            }
        }

        error!(
            "envelope reset gave up after {} attempts; device stays busy",
            self.reset_attempts
        );
        Err(Error::ResetRetryExhausted {
            attempts: self.reset_attempts,
        })
    }

    /// Write a fresh device node: offline, idle envelope, no results.
    pub fn provision(&mut self) -> Result<()> {
        let node = json!({
            "Last_Seen": 0,
            "Status": "offline",
            "Command": {
                "Type": "none",
                "Status": "idle",
                "Cancelled": false,
                "Data": {},
                "Result": RESULT_NONE,
            },
        });
        self.write("", &node)?;
        info!("Device node {} provisioned", self.path(""));
        Ok(())
    }
}
