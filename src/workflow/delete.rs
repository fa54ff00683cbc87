//! Deletion workflow.
//!
//! `Idle → Validate → Process → Inactive`.  Every terminal path publishes a
//! `Deletion_Result` of the form `{Status, Info}` and resets the envelope.
//! A successful erase returns the slot to the pool.

use log::{debug, info, warn};
use serde_json::json;

use crate::app::events::{Outcome, WorkflowKind};
use crate::app::ports::Occupancy;
use crate::channel::ResultDoc;
use crate::error::{Error, Result};
use crate::feedback::Tone;
use crate::slots::SlotId;

use super::context::WorkflowContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteState {
    #[default]
    Inactive,
    Idle,
    Validate,
    Process { slot: SlotId },
}

impl DeleteState {
    fn name(self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Idle => "Idle",
            Self::Validate => "Validate",
            Self::Process { .. } => "Process",
        }
    }
}

#[derive(Debug, Default)]
pub struct DeleteWorkflow {
    state: DeleteState,
}

impl DeleteWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.state = DeleteState::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.state != DeleteState::Inactive
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }

    pub fn tick(&mut self, ctx: &mut WorkflowContext<'_>) {
        if !self.is_active() {
            return;
        }
        match self.step(ctx) {
            Ok(None) => {}
            Ok(Some(next)) => {
                info!("DELETE: {} -> {}", self.state.name(), next.name());
                self.state = next;
            }
            Err(e) if e.is_transient() => debug!("DELETE: {}, retrying next tick", e),
            Err(Error::Cancelled) => {
                Self::cancel(ctx);
                self.state = DeleteState::Inactive;
            }
            Err(e) => {
                warn!("DELETE: failed in {}: {}", self.state.name(), e);
                let reason = e.to_string();
                Self::conclude(ctx, false, &reason, None);
                let lines: &[&str] = match e {
                    Error::Validation(_) => &["Invalid ID", "Field"],
                    Error::OutOfRange { .. } => &["ID Out of", "Range"],
                    _ => &["Deletion", "Error"],
                };
                ctx.notify(lines, Tone::Failure);
                self.state = DeleteState::Inactive;
            }
        }
    }

    fn step(&mut self, ctx: &mut WorkflowContext<'_>) -> Result<Option<DeleteState>> {
        if ctx.channel.peek_cancelled()? {
            return Err(Error::Cancelled);
        }

        match self.state {
            DeleteState::Inactive => Ok(None),

            DeleteState::Idle => {
                ctx.notify(&["Deletion", "Starting..."], Tone::Prompt);
                Ok(Some(DeleteState::Validate))
            }

            DeleteState::Validate => {
                let max = ctx.config.max_slot();
                let raw = ctx
                    .channel
                    .read_int("ID")?
                    .ok_or(Error::Validation("Invalid or missing ID field"))?;
                let slot = SlotId::try_from(raw)
                    .ok()
                    .filter(|&id| id <= max)
                    .ok_or(Error::OutOfRange { max })?;
                let line = format!("Delete ID: {slot}");
                ctx.notify(&[line.as_str()], Tone::Prompt);
                Ok(Some(DeleteState::Process { slot }))
            }

            DeleteState::Process { slot } => {
                let id_line = format!("ID: {slot}");
                match ctx.hw.probe(slot) {
                    Ok(Occupancy::Occupied) => match ctx.hw.erase(slot) {
                        Ok(()) => {
                            let info = format!("Fingerprint deleted at ID {slot}");
                            Self::conclude(ctx, true, &info, Some(slot));
                            ctx.slots.release(slot);
                            ctx.notify(&["Deleted", "Successfully!"], Tone::Success);
                        }
                        Err(e) => {
                            let info = Error::from(e).to_string();
                            Self::conclude(ctx, false, &info, Some(slot));
                            ctx.notify(&["Deletion", "Error", info.as_str()], Tone::Failure);
                        }
                    },
                    Ok(Occupancy::Empty) => {
                        Self::conclude(ctx, false, "No fingerprint at given ID", Some(slot));
                        ctx.notify(&["No Print at", id_line.as_str()], Tone::Failure);
                    }
                    Err(e) => {
                        let info = Error::from(e).to_string();
                        Self::conclude(ctx, false, &info, Some(slot));
                        ctx.notify(&["Deletion", "Error", info.as_str()], Tone::Failure);
                    }
                }
                Ok(Some(DeleteState::Inactive))
            }
        }
    }

    fn cancel(ctx: &mut WorkflowContext<'_>) {
        info!("DELETE: cancelled");
        let doc = json!({ "Status": "Cancelled", "Info": "Deletion cancelled by user" });
        if let Err(e) = ctx.channel.publish(ResultDoc::Deletion, &doc) {
            warn!("DELETE: cancel result not published: {}", e);
        }
        ctx.notify(&["Deletion", "Cancelled"], Tone::Failure);
        ctx.finish(WorkflowKind::Delete, Outcome::Cancelled, None);
    }

    /// Publish `{Status, Info}` and reset the envelope.
    fn conclude(ctx: &mut WorkflowContext<'_>, success: bool, info: &str, slot: Option<SlotId>) {
        let status = if success { "Success" } else { "Failure" };
        info!("DELETE: {} ({})", status, info);
        let doc = json!({ "Status": status, "Info": info });
        if let Err(e) = ctx.channel.publish(ResultDoc::Deletion, &doc) {
            warn!("DELETE: result not published: {}", e);
        }
        let outcome = if success {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        ctx.finish(WorkflowKind::Delete, outcome, slot);
    }
}
