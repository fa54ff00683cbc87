//! Command dispatcher.
//!
//! Polls the command envelope at a fixed interval and claims pending
//! commands.  Starting the matching workflow is left to the caller, which
//! owns the workflows; the dispatcher only reports what it claimed.
//!
//! ```text
//!   Status == pending ──▶ read Type, Result ──▶ Status := processing
//!                                                     │
//!                        ┌────────────────────────────┤
//!                        ▼                            ▼
//!                 known Type: claimed         unknown Type: logged,
//!                 command returned            envelope left processing
//! ```

use log::{debug, info, warn};

use crate::app::events::{AppEvent, WorkflowKind};
use crate::channel::{CommandStatus, CommandType};
use crate::feedback::Tone;
use crate::workflow::WorkflowContext;

/// A command the dispatcher has taken ownership of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedCommand {
    pub kind: CommandType,
    /// `Command/Result` as read just before the claim.
    pub result: String,
}

impl CommandType {
    /// The workflow serving this command, if any.
    pub fn workflow(&self) -> Option<WorkflowKind> {
        match self {
            Self::Enroll => Some(WorkflowKind::Enroll),
            Self::Delete => Some(WorkflowKind::Delete),
            Self::Attendance => Some(WorkflowKind::Attendance),
            Self::None | Self::Unknown(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    poll_interval_ms: u64,
    last_poll_ms: Option<u64>,
}

impl Dispatcher {
    pub fn new(poll_interval_ms: u32) -> Self {
        Self {
            poll_interval_ms: u64::from(poll_interval_ms),
            last_poll_ms: None,
        }
    }

    /// `true` when the poll interval has elapsed since the last poll.
    pub fn due(&self, now_ms: u64) -> bool {
        match self.last_poll_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.poll_interval_ms,
        }
    }

    /// Check the envelope once and claim a pending command.
    ///
    /// Does nothing while `busy` (a workflow is running), before the poll
    /// interval has elapsed, or while the store is offline.  A failed claim
    /// write leaves the command pending for the next poll.
    pub fn poll(&mut self, busy: bool, ctx: &mut WorkflowContext<'_>) -> Option<ClaimedCommand> {
        let now = ctx.now_ms();
        if busy || !self.due(now) || !ctx.channel.is_ready() {
            return None;
        }
        self.last_poll_ms = Some(now);

        match ctx.channel.peek_status() {
            Ok(CommandStatus::Pending) => {}
            Ok(_) => return None,
            Err(e) => {
                debug!("DISPATCH: status unreadable: {}", e);
                return None;
            }
        }

        let (kind, result) = match (ctx.channel.peek_type(), ctx.channel.peek_result()) {
            (Ok(kind), Ok(result)) => (kind, result),
            (Err(e), _) | (_, Err(e)) => {
                debug!("DISPATCH: envelope unreadable: {}", e);
                return None;
            }
        };

        if let Err(e) = ctx.channel.claim() {
            warn!("DISPATCH: claim failed, retrying next poll: {}", e);
            return None;
        }
        info!("DISPATCH: claimed {:?} (result={})", kind, result);

        match kind.workflow() {
            Some(workflow) => {
                let (label, starting) = match workflow {
                    WorkflowKind::Enroll => ("ENROLLMENT", "Starting Enroll"),
                    WorkflowKind::Delete => ("DELETION", "Starting Delete"),
                    WorkflowKind::Attendance => ("ATTENDANCE", "Starting Attend"),
                };
                ctx.notify(&["Command:", label], Tone::Prompt);
                ctx.notify(&[starting], Tone::Intermediate);
                ctx.emit(AppEvent::CommandClaimed(workflow));
            }
            None => {
                let name = match &kind {
                    CommandType::Unknown(s) => s.clone(),
                    _ => "none".into(),
                };
                warn!("DISPATCH: unknown command type '{}'", name);
                ctx.notify(&["Unknown", "Command"], Tone::Failure);
                ctx.emit(AppEvent::UnknownCommand(name));
            }
        }

        Some(ClaimedCommand { kind, result })
    }
}
