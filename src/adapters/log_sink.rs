//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { free_slots } => {
                info!("START | free_slots={}", free_slots);
            }
            AppEvent::CommandClaimed(kind) => {
                info!("CMD | claimed={:?}", kind);
            }
            AppEvent::UnknownCommand(ty) => {
                info!("CMD | unknown type={:?}", ty);
            }
            AppEvent::WorkflowFinished {
                workflow,
                outcome,
                slot,
            } => match slot {
                Some(id) => info!("DONE | {:?} outcome={:?} slot={}", workflow, outcome, id),
                None => info!("DONE | {:?} outcome={:?}", workflow, outcome),
            },
            AppEvent::AttendanceEntry { index, student } => {
                info!("ATT | entry={} student={}", index, student);
            }
            AppEvent::EntryResolved { index, status } => {
                info!("ATT | entry={} status={}", index, status);
            }
            AppEvent::ResetFailed { attempts } => {
                error!("CMD | reset failed after {} attempts", attempts);
            }
            AppEvent::Heartbeat { unix_time } => {
                info!("BEAT | last_seen={}", unix_time);
            }
        }
    }
}
