//! Enrollment workflow.
//!
//! ```text
//!  Idle ──[slot + Name/Roll_No]──▶ Scan1 ──[no match]──▶ Scan2
//!                                    │                      │
//!                                [match: duplicate]      [vectorized]
//!                                    ▼                      ▼
//!                                 Inactive ◀──[stored]── Store ◀── Create
//! ```
//!
//! Guards run before the state handler on every tick, in order: an
//! unconsumed `Enrollment_Result`, an unacknowledged `Command/Result`, then
//! the cancel flag.  The slot is taken from the pool on leaving `Idle` and
//! handed back on every path that does not end in a stored template.

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::app::events::{Outcome, WorkflowKind};
use crate::app::ports::{Capture, CharBuffer, SearchHit};
use crate::channel::{RESULT_DATA_NOT_FOUND, RESULT_NONE, RESULT_NOT_SAVED, ResultDoc};
use crate::error::{Error, Result};
use crate::feedback::Tone;
use crate::slots::SlotId;

use super::context::WorkflowContext;

/// The person being enrolled and the slot reserved for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollee {
    pub slot: SlotId,
    pub name: String,
    pub roll_no: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnrollState {
    #[default]
    Inactive,
    Idle,
    Scan1(Enrollee),
    Scan2(Enrollee),
    Create(Enrollee),
    Store(Enrollee),
}

impl EnrollState {
    fn slot(&self) -> Option<SlotId> {
        match self {
            Self::Scan1(e) | Self::Scan2(e) | Self::Create(e) | Self::Store(e) => Some(e.slot),
            Self::Inactive | Self::Idle => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Idle => "Idle",
            Self::Scan1(_) => "Scan1",
            Self::Scan2(_) => "Scan2",
            Self::Create(_) => "Create",
            Self::Store(_) => "Store",
        }
    }
}

#[derive(Debug, Default)]
pub struct EnrollWorkflow {
    state: EnrollState,
    /// `Command/Result` was not `none` when the command was claimed.
    ack_outstanding: bool,
}

impl EnrollWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate for a freshly claimed command.
    pub fn start(&mut self, command_result: &str) {
        self.state = EnrollState::Idle;
        self.ack_outstanding = command_result != RESULT_NONE;
    }

    pub fn is_active(&self) -> bool {
        self.state != EnrollState::Inactive
    }

    pub fn state(&self) -> &EnrollState {
        &self.state
    }

    /// Advance by at most one transition.
    pub fn tick(&mut self, ctx: &mut WorkflowContext<'_>) {
        if !self.is_active() {
            return;
        }
        match self.step(ctx) {
            Ok(None) => {}
            Ok(Some(next)) => {
                info!("ENROLL: {} -> {}", self.state.name(), next.name());
                self.state = next;
            }
            Err(e) if e.is_transient() => debug!("ENROLL: {}, retrying next tick", e),
            Err(Error::Cancelled) => self.cancel(ctx),
            Err(Error::ResultOutstanding) => self.reject(ctx, &["Enrollment", "Failed"]),
            Err(Error::Validation(msg)) => {
                warn!("ENROLL: {}", msg);
                if let Err(e) = ctx.channel.set_result(RESULT_DATA_NOT_FOUND) {
                    warn!("ENROLL: could not flag Command/Result: {}", e);
                }
                self.reject(ctx, &["Enrollment", "Data Missing"]);
            }
            Err(e) => self.abort(ctx, e),
        }
    }

    fn step(&mut self, ctx: &mut WorkflowContext<'_>) -> Result<Option<EnrollState>> {
        self.guards(ctx)?;

        match &self.state {
            EnrollState::Inactive => Ok(None),
            EnrollState::Idle => Self::reserve(ctx),

            EnrollState::Scan1(e) => {
                if ctx.hw.capture()? == Capture::NoFinger {
                    return Ok(None);
                }
                ctx.hw.vectorize(CharBuffer::One)?;
                match ctx.hw.search()? {
                    SearchHit::NotFound => {
                        ctx.notify(&["Scan 1 Complete!", "Scan 2", "Place Finger"], Tone::Success);
                        Ok(Some(EnrollState::Scan2(e.clone())))
                    }
                    SearchHit::Found { slot, confidence } => {
                        Self::duplicate(ctx, e.slot, slot, confidence);
                        Ok(Some(EnrollState::Inactive))
                    }
                }
            }

            EnrollState::Scan2(e) => {
                if ctx.hw.capture()? == Capture::NoFinger {
                    return Ok(None);
                }
                ctx.hw.vectorize(CharBuffer::Two)?;
                ctx.notify(&["Scan 2 Complete!", "Creating Model..."], Tone::Waiting);
                Ok(Some(EnrollState::Create(e.clone())))
            }

            EnrollState::Create(e) => {
                ctx.hw.combine()?;
                ctx.notify(&["Model Created!", "Storing Model..."], Tone::Waiting);
                Ok(Some(EnrollState::Store(e.clone())))
            }

            EnrollState::Store(e) => {
                ctx.hw.persist(e.slot)?;
                Self::complete(ctx, e);
                Ok(Some(EnrollState::Inactive))
            }
        }
    }

    /// Checks that pre-empt any state handler.
    fn guards(&self, ctx: &mut WorkflowContext<'_>) -> Result<()> {
        if ctx.channel.result_exists(ResultDoc::Enrollment)? {
            warn!("ENROLL: previous Enrollment_Result not consumed");
            if let Err(e) = ctx.channel.set_result(RESULT_NOT_SAVED) {
                warn!("ENROLL: could not flag Command/Result: {}", e);
            }
            return Err(Error::ResultOutstanding);
        }
        if self.ack_outstanding {
            warn!("ENROLL: Command/Result not acknowledged");
            return Err(Error::ResultOutstanding);
        }
        if ctx.channel.peek_cancelled()? {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Idle: check the pool, validate the payload, then take a slot.
    fn reserve(ctx: &mut WorkflowContext<'_>) -> Result<Option<EnrollState>> {
        if ctx.slots.is_exhausted() {
            return Err(Error::ResourceExhausted);
        }

        let name = ctx.channel.read_string("Name")?.filter(|s| !s.is_empty());
        let roll_no = ctx.channel.read_string("Roll_No")?.filter(|s| !s.is_empty());
        let (Some(name), Some(roll_no)) = (name, roll_no) else {
            return Err(Error::Validation("Name or Roll_No missing"));
        };

        let slot = ctx.slots.allocate()?;
        info!("ENROLL: '{}' ({}) -> slot {}", name, roll_no, slot);
        let id_line = format!("ID: {slot}");
        ctx.notify(&["Enrollment Ready", id_line.as_str(), "Place Finger"], Tone::Prompt);

        Ok(Some(EnrollState::Scan1(Enrollee {
            slot,
            name,
            roll_no,
        })))
    }

    fn duplicate(ctx: &mut WorkflowContext<'_>, reserved: SlotId, existing: SlotId, confidence: u16) {
        info!(
            "ENROLL: finger already enrolled at {} (confidence {})",
            existing, confidence
        );
        let doc = json!({
            "Status": "Success",
            "Type": "duplicate",
            "Data": {},
            "ID": existing.to_string(),
        });
        if let Err(e) = ctx.channel.publish(ResultDoc::Enrollment, &doc) {
            warn!("ENROLL: duplicate result not published: {}", e);
        }
        ctx.slots.release(reserved);
        let id_line = format!("ID: {existing}");
        ctx.notify(&["Duplicate", "Fingerprint", id_line.as_str()], Tone::Failure);
        ctx.finish(WorkflowKind::Enroll, Outcome::Duplicate, Some(existing));
    }

    /// Template stored: the slot is now consumed.
    fn complete(ctx: &mut WorkflowContext<'_>, e: &Enrollee) {
        info!("ENROLL: stored '{}' at slot {}", e.name, e.slot);
        let doc = json!({
            "Status": "Success",
            "Type": "New",
            "Data": { "Name": e.name, "Roll_No": e.roll_no },
            "ID": e.slot,
        });
        if let Err(err) = ctx.channel.publish(ResultDoc::Enrollment, &doc) {
            warn!("ENROLL: success result not published: {}", err);
        }
        let name_line = format!("Name: {}", e.name);
        let roll_line = format!("Roll No: {}", e.roll_no);
        ctx.notify(&["Enrollment Successful", name_line.as_str(), roll_line.as_str()], Tone::Ready);
        ctx.finish(WorkflowKind::Enroll, Outcome::Success, Some(e.slot));
    }

    fn cancel(&mut self, ctx: &mut WorkflowContext<'_>) {
        info!("ENROLL: cancelled in {}", self.state.name());
        let doc = json!({
            "Status": "Cancelled",
            "Type": "None",
            "Data": {},
            "ID": "None",
        });
        if let Err(e) = ctx.channel.publish(ResultDoc::Enrollment, &doc) {
            warn!("ENROLL: cancel result not published: {}", e);
        }
        let slot = self.state.slot();
        if let Some(id) = slot {
            ctx.slots.release(id);
        }
        ctx.notify(&["Enrollment", "Cancelled"], Tone::Failure);
        ctx.finish(WorkflowKind::Enroll, Outcome::Cancelled, slot);
        self.state = EnrollState::Inactive;
    }

    /// Give up without writing a result document.
    fn reject(&mut self, ctx: &mut WorkflowContext<'_>, lines: &[&str]) {
        let slot = self.state.slot();
        if let Some(id) = slot {
            ctx.slots.release(id);
        }
        ctx.notify(lines, Tone::Failure);
        ctx.finish(WorkflowKind::Enroll, Outcome::Rejected, slot);
        self.state = EnrollState::Inactive;
    }

    fn abort(&mut self, ctx: &mut WorkflowContext<'_>, err: Error) {
        warn!("ENROLL: failed in {}: {}", self.state.name(), err);
        let reason = err.to_string();
        let doc = failure_doc(&reason);
        if let Err(e) = ctx.channel.publish(ResultDoc::Enrollment, &doc) {
            warn!("ENROLL: failure result not published: {}", e);
        }
        let slot = self.state.slot();
        if let Some(id) = slot {
            ctx.slots.release(id);
        }
        ctx.notify(&["Enrollment", "Failed", reason.as_str()], Tone::Failure);
        ctx.finish(WorkflowKind::Enroll, Outcome::Failure, slot);
        self.state = EnrollState::Inactive;
    }
}

fn failure_doc(reason: &str) -> Value {
    json!({
        "Status": "Failure",
        "Type": "None",
        "Data": {},
        "ID": "None",
        "Info": reason,
    })
}
