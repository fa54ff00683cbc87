//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) and the workflows emit
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! on the other side decide what to do with them.

use crate::slots::SlotId;

/// Which workflow an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Enroll,
    Delete,
    Attendance,
}

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Duplicate,
    Failure,
    Cancelled,
    /// Aborted without publishing a result document.
    Rejected,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot scan finished; carries the number of allocatable slots.
    Started { free_slots: usize },

    /// A pending command was claimed and its workflow started.
    CommandClaimed(WorkflowKind),

    /// A pending command had a type the firmware does not handle.
    UnknownCommand(String),

    /// A workflow returned to `Inactive`.
    WorkflowFinished {
        workflow: WorkflowKind,
        outcome: Outcome,
        slot: Option<SlotId>,
    },

    /// An attendance entry was written and is awaiting resolution.
    AttendanceEntry { index: u32, student: String },

    /// The remote actor (or the timeout) resolved an attendance entry.
    EntryResolved { index: u32, status: String },

    /// The envelope could not be returned to idle.
    ResetFailed { attempts: u8 },

    /// `Last_Seen` was written.
    Heartbeat { unix_time: u64 },
}
