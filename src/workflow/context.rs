//! Shared context threaded through the dispatcher and every workflow.
//!
//! `WorkflowContext` bundles everything a workflow step may touch during one
//! control-loop tick: the command channel, the board hardware, the clock,
//! the event sink, the slot pool and the configuration.  It is rebuilt every
//! tick from borrows, so no workflow can hold on to a collaborator between
//! ticks.

use log::error;

use crate::app::events::{AppEvent, Outcome, WorkflowKind};
use crate::app::ports::{ClockPort, EventSink, Hardware};
use crate::channel::CommandChannel;
use crate::config::SystemConfig;
use crate::error::Error;
use crate::feedback::Tone;
use crate::slots::{SlotAllocator, SlotId};

pub struct WorkflowContext<'a> {
    pub channel: CommandChannel<'a>,
    pub hw: &'a mut dyn Hardware,
    pub clock: &'a dyn ClockPort,
    pub sink: &'a mut dyn EventSink,
    pub slots: &'a mut SlotAllocator,
    pub config: &'a SystemConfig,
}

impl WorkflowContext<'_> {
    /// Show `lines` and play `tone`.
    pub fn notify(&mut self, lines: &[&str], tone: Tone) {
        self.hw.notify(lines, Some(tone));
    }

    /// Show `lines` without sound.
    pub fn show(&mut self, lines: &[&str]) {
        self.hw.notify(lines, None);
    }

    pub fn emit(&mut self, event: AppEvent) {
        self.sink.emit(&event);
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }

    /// Wall-clock seconds, or 0 while the clock is unsynchronised.
    pub fn unix_now(&self) -> u64 {
        self.clock.unix_time().unwrap_or(0)
    }

    /// Close out a workflow run: reset the envelope and report the outcome.
    pub fn finish(&mut self, workflow: WorkflowKind, outcome: Outcome, slot: Option<SlotId>) {
        if let Err(e) = self.channel.reset_to_idle() {
            error!("{:?}: {}", workflow, e);
            if let Error::ResetRetryExhausted { attempts } = e {
                self.emit(AppEvent::ResetFailed { attempts });
            }
        }
        self.emit(AppEvent::WorkflowFinished {
            workflow,
            outcome,
            slot,
        });
    }
}
