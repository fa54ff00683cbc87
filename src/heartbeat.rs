//! Liveness reporter.
//!
//! Writes the wall-clock time to `Last_Seen` on a fixed interval so the
//! remote side can tell whether the terminal is online.  Nothing is written
//! until the clock has been synchronised.

use log::warn;
use serde_json::json;

use crate::app::events::AppEvent;
use crate::channel::LAST_SEEN;
use crate::workflow::WorkflowContext;

/// Unix times at or below this are treated as "clock not set".
pub const MIN_VALID_UNIX: u64 = 100_000;

#[derive(Debug)]
pub struct LivenessReporter {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl LivenessReporter {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            last_ms: None,
        }
    }

    fn due(&self, now_ms: u64) -> bool {
        self.last_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    /// Report liveness if the interval has elapsed.
    ///
    /// Returns the unix time written, if any.  A failed write is logged and
    /// retried at the next interval.
    pub fn tick(&mut self, ctx: &mut WorkflowContext<'_>) -> Option<u64> {
        let now = ctx.now_ms();
        if !self.due(now) {
            return None;
        }
        self.last_ms = Some(now);

        let unix = ctx.clock.unix_time().filter(|&t| t > MIN_VALID_UNIX)?;
        if let Err(e) = ctx.channel.write(LAST_SEEN, &json!(unix)) {
            warn!("heartbeat not written: {}", e);
            return None;
        }
        ctx.emit(AppEvent::Heartbeat { unix_time: unix });
        Some(unix)
    }
}
