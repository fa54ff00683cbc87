//! Command workflows.
//!
//! Each workflow is a small non-blocking state machine that advances by at
//! most one transition per control-loop tick.  All collaborators arrive
//! through a [`WorkflowContext`] built fresh for that tick.
//!
//! At most one workflow is active at a time; the dispatcher will not claim
//! a new command while [`Workflows::any_active`] holds.

pub mod attendance;
pub mod context;
pub mod delete;
pub mod enroll;

use log::warn;

use crate::channel::CommandType;

pub use attendance::{AttendanceState, AttendanceWorkflow};
pub use context::WorkflowContext;
pub use delete::{DeleteState, DeleteWorkflow};
pub use enroll::{EnrollState, EnrollWorkflow};

/// The three workflows, owned together.
#[derive(Debug, Default)]
pub struct Workflows {
    pub enroll: EnrollWorkflow,
    pub delete: DeleteWorkflow,
    pub attendance: AttendanceWorkflow,
}

impl Workflows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_active(&self) -> bool {
        self.enroll.is_active() || self.delete.is_active() || self.attendance.is_active()
    }

    /// Activate the workflow for a claimed command.
    ///
    /// `command_result` is the `Command/Result` value read at claim time.
    /// Returns `false` when `kind` names no workflow.
    pub fn start(&mut self, kind: &CommandType, command_result: &str) -> bool {
        if self.any_active() {
            warn!("workflow already active, ignoring {:?}", kind);
            return false;
        }
        match kind {
            CommandType::Enroll => self.enroll.start(command_result),
            CommandType::Delete => self.delete.start(),
            CommandType::Attendance => self.attendance.start(),
            CommandType::None | CommandType::Unknown(_) => return false,
        }
        true
    }

    /// Give every workflow one step.  Inactive ones return immediately.
    pub fn tick(&mut self, ctx: &mut WorkflowContext<'_>) {
        self.enroll.tick(ctx);
        self.delete.tick(ctx);
        self.attendance.tick(ctx);
    }
}
