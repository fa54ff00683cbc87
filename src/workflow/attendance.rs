//! Attendance session workflow.
//!
//! ```text
//!  Idle ──[record opened]──▶ WaitFinger ──[image]──▶ CaptureImage
//!                               ▲    ▲                    │
//!                               │    └──[search/write     │ [entry written]
//!                               │        failed]──────────┤
//!                               │                         ▼
//!                               └──[resolved / timeout]── VerifyStatus
//! ```
//!
//! A session has no natural end: it runs until the remote actor cancels it.
//! Each recognised finger becomes `Students/Student<n>` with status
//! `pending`; the device then polls that entry until the remote actor
//! resolves it or the entry timeout expires.

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::app::events::{AppEvent, Outcome, WorkflowKind};
use crate::app::ports::{Capture, CharBuffer, SearchHit};
use crate::channel::ResultDoc;
use crate::error::{Error, Result};
use crate::feedback::Tone;

use super::context::WorkflowContext;

/// Student id written when the finger matches no template.
pub const NOT_FOUND_ID: &str = "Not_Found";
/// Status the device writes on an entry nobody resolved in time.
pub const TIMEOUT_STATUS: &str = "Timeout";

/// An open attendance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub class: String,
    /// Index of the next (or current) `Student<n>` entry.
    pub index: u32,
}

impl Session {
    fn entry_path(&self) -> String {
        format!("{}/Students/Student{}", ResultDoc::Attendance.path(), self.index)
    }

    fn advance(&self) -> Self {
        Self {
            class: self.class.clone(),
            index: self.index + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttendanceState {
    #[default]
    Inactive,
    Idle,
    WaitFinger(Session),
    CaptureImage(Session),
    VerifyStatus { session: Session, since_ms: u64 },
}

impl AttendanceState {
    fn session(&self) -> Option<&Session> {
        match self {
            Self::WaitFinger(s) | Self::CaptureImage(s) | Self::VerifyStatus { session: s, .. } => {
                Some(s)
            }
            Self::Inactive | Self::Idle => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Idle => "Idle",
            Self::WaitFinger(_) => "WaitFinger",
            Self::CaptureImage(_) => "CaptureImage",
            Self::VerifyStatus { .. } => "VerifyStatus",
        }
    }
}

#[derive(Debug, Default)]
pub struct AttendanceWorkflow {
    state: AttendanceState,
}

impl AttendanceWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.state = AttendanceState::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.state != AttendanceState::Inactive
    }

    pub fn state(&self) -> &AttendanceState {
        &self.state
    }

    pub fn tick(&mut self, ctx: &mut WorkflowContext<'_>) {
        if !self.is_active() {
            return;
        }
        match self.step(ctx) {
            Ok(None) => {}
            Ok(Some(next)) => {
                if next.name() != self.state.name() {
                    info!("ATTEND: {} -> {}", self.state.name(), next.name());
                }
                self.state = next;
            }
            Err(e) if e.is_transient() => debug!("ATTEND: {}, retrying next tick", e),
            Err(Error::Cancelled) => {
                self.stop(ctx);
                self.state = AttendanceState::Inactive;
            }
            Err(Error::Validation(msg)) => {
                warn!("ATTEND: {}", msg);
                ctx.notify(&["Attendance", "Failed", "Class Missing"], Tone::Failure);
                ctx.finish(WorkflowKind::Attendance, Outcome::Rejected, None);
                self.state = AttendanceState::Inactive;
            }
            Err(e) => {
                warn!("ATTEND: failed in {}: {}", self.state.name(), e);
                ctx.notify(&["Attendance", "Failed"], Tone::Failure);
                ctx.finish(WorkflowKind::Attendance, Outcome::Failure, None);
                self.state = AttendanceState::Inactive;
            }
        }
    }

    fn step(&mut self, ctx: &mut WorkflowContext<'_>) -> Result<Option<AttendanceState>> {
        if ctx.channel.peek_cancelled()? {
            return Err(Error::Cancelled);
        }

        match &self.state {
            AttendanceState::Inactive => Ok(None),
            AttendanceState::Idle => Self::open(ctx),

            AttendanceState::WaitFinger(session) => match ctx.hw.capture() {
                Ok(Capture::NoFinger) => Ok(None),
                Ok(Capture::Image) => {
                    ctx.notify(&["Processing", "Fingerprint..."], Tone::Waiting);
                    Ok(Some(AttendanceState::CaptureImage(session.clone())))
                }
                Err(e) => {
                    debug!("ATTEND: capture error {}", e);
                    ctx.notify(&["Scan Error", "Retry..."], Tone::Failure);
                    Ok(None)
                }
            },

            AttendanceState::CaptureImage(session) => Ok(Some(Self::record(ctx, session))),

            AttendanceState::VerifyStatus { session, since_ms } => {
                Self::verify(ctx, session, *since_ms)
            }
        }
    }

    /// Idle: validate the payload and open a fresh `Attendance_Record`.
    fn open(ctx: &mut WorkflowContext<'_>) -> Result<Option<AttendanceState>> {
        let class = ctx
            .channel
            .read_string("Class")?
            .filter(|c| !c.is_empty())
            .ok_or(Error::Validation("Class missing"))?;
        let section = ctx.channel.read_string("Section")?.unwrap_or_default();

        let record = json!({
            "Class": class,
            "Section": section,
            "Start_Time": ctx.unix_now(),
            "End_Time": 0,
            "Students": {},
        });
        ctx.channel.publish(ResultDoc::Attendance, &record)?;

        info!("ATTEND: session opened for {} {}", class, section);
        ctx.notify(&["Attendance", "Started", class.as_str()], Tone::Intermediate);
        Ok(Some(AttendanceState::WaitFinger(Session { class, index: 0 })))
    }

    /// CaptureImage: identify the finger and write a pending entry.
    fn record(ctx: &mut WorkflowContext<'_>, session: &Session) -> AttendanceState {
        let retry = AttendanceState::WaitFinger(session.clone());

        if let Err(e) = ctx.hw.vectorize(CharBuffer::One) {
            debug!("ATTEND: vectorize failed {}", e);
            ctx.notify(&["Processing", "Failed"], Tone::Failure);
            return retry;
        }

        let student = match ctx.hw.search() {
            Ok(SearchHit::Found { slot, .. }) => slot.to_string(),
            Ok(SearchHit::NotFound) => NOT_FOUND_ID.to_string(),
            Err(e) => {
                debug!("ATTEND: search failed {}", e);
                ctx.notify(&["Search", "Failed"], Tone::Failure);
                return retry;
            }
        };

        let entry = json!({ "Status": "pending", "ID": student, "Data": {} });
        if ctx.channel.write(&session.entry_path(), &entry).is_err() {
            ctx.notify(&["Firebase", "Error"], Tone::Failure);
            return retry;
        }

        let number = format!("Student #{}", session.index + 1);
        let id_line = format!("ID: {student}");
        ctx.notify(&["Recorded", number.as_str(), id_line.as_str()], Tone::Success);
        ctx.emit(AppEvent::AttendanceEntry {
            index: session.index,
            student,
        });
        AttendanceState::VerifyStatus {
            session: session.clone(),
            since_ms: ctx.now_ms(),
        }
    }

    /// VerifyStatus: poll the entry until it leaves `pending`.
    fn verify(
        ctx: &mut WorkflowContext<'_>,
        session: &Session,
        since_ms: u64,
    ) -> Result<Option<AttendanceState>> {
        let entry = session.entry_path();
        let status = ctx.channel.read(&format!("{entry}/Status"))?;
        let status = status.as_ref().and_then(Value::as_str).unwrap_or("pending");

        if status == "pending" {
            let timeout_ms = u64::from(ctx.config.attendance_entry_timeout_secs) * 1_000;
            if timeout_ms == 0 || ctx.now_ms().saturating_sub(since_ms) < timeout_ms {
                return Ok(None);
            }
            warn!("ATTEND: Student{} unresolved, timing out", session.index);
            if let Err(e) = ctx.channel.write(&format!("{entry}/Status"), &json!(TIMEOUT_STATUS)) {
                warn!("ATTEND: timeout not recorded: {}", e);
            }
            ctx.notify(&["Verification", "Timed Out"], Tone::Failure);
            Self::resolved(ctx, session, TIMEOUT_STATUS);
            return Ok(Some(AttendanceState::WaitFinger(session.advance())));
        }

        match status {
            "Success" => {
                let data = ctx.channel.read(&format!("{entry}/Data"))?;
                let (name, roll_no) = student_details(data.as_ref());
                let name_line = format!("Name: {name}");
                let roll_line = format!("Roll No: {roll_no}");
                ctx.notify(
                    &["Attendance Recorded!", name_line.as_str(), roll_line.as_str()],
                    Tone::Success,
                );
            }
            "Not_Found" => ctx.notify(&["Fingerprint", "Not Found"], Tone::Failure),
            "Not_in_Class" => ctx.notify(&["Student Not", "in Class"], Tone::Failure),
            other => {
                let line = format!("Status: {other}");
                ctx.notify(&[line.as_str()], Tone::Intermediate);
            }
        }

        Self::resolved(ctx, session, status);
        Ok(Some(AttendanceState::WaitFinger(session.advance())))
    }

    fn resolved(ctx: &mut WorkflowContext<'_>, session: &Session, status: &str) {
        info!("ATTEND: Student{} -> {}", session.index, status);
        ctx.emit(AppEvent::EntryResolved {
            index: session.index,
            status: status.to_string(),
        });
    }

    /// Cancellation: stamp `End_Time` if a session was opened.
    fn stop(&self, ctx: &mut WorkflowContext<'_>) {
        if let Some(session) = self.state.session() {
            let end = json!(ctx.unix_now());
            let path = format!("{}/End_Time", ResultDoc::Attendance.path());
            if let Err(e) = ctx.channel.write(&path, &end) {
                warn!("ATTEND: End_Time not written: {}", e);
            }
            info!("ATTEND: session {} stopped after {} entries", session.class, session.index);
        } else {
            info!("ATTEND: cancelled before start");
        }
        ctx.notify(&["Attendance", "Stopped"], Tone::Failure);
        ctx.finish(WorkflowKind::Attendance, Outcome::Cancelled, None);
    }
}

/// Pull `Name` / `Roll_No` out of an entry's `Data`, which the remote actor
/// may write either as an object or as a JSON-encoded string.
fn student_details(data: Option<&Value>) -> (String, String) {
    let parsed;
    let obj = match data {
        Some(Value::String(s)) => {
            parsed = serde_json::from_str::<Value>(s).ok();
            parsed.as_ref()
        }
        other => other,
    };
    let field = |key: &str| {
        obj.and_then(|o| o.get(key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };
    (field("Name"), field("Roll_No"))
}
