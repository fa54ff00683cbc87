//! Application service: the hexagonal core.
//!
//! [`AppService`] owns every piece of process-lifetime state: the slot
//! pool, the dispatcher, the three workflows and the liveness reporter.
//! All I/O flows through port traits injected at call sites, so the whole
//! service runs against mock adapters on the host.
//!
//! ```text
//!  FingerprintPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   FeedbackPort  ◀──  │          AppService          │
//!                      │ Dispatcher · Workflows · Beat│
//! RemoteStorePort ◀──▶ └──────────────────────────────┘ ◀── ClockPort
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::channel::CommandChannel;
use crate::config::SystemConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::heartbeat::LivenessReporter;
use crate::slots::SlotAllocator;
use crate::workflow::{WorkflowContext, Workflows};

use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, Hardware, RemoteStorePort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: SystemConfig,
    slots: SlotAllocator,
    dispatcher: Dispatcher,
    workflows: Workflows,
    heartbeat: LivenessReporter,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// The slot pool starts empty of knowledge; call [`start`](Self::start)
    /// to scan the sensor before the first tick.
    pub fn new(config: SystemConfig) -> Self {
        let slots = SlotAllocator::with_occupied(config.slot_capacity, &[]);
        let dispatcher = Dispatcher::new(config.command_poll_interval_ms);
        let heartbeat = LivenessReporter::new(config.heartbeat_interval_ms);
        Self {
            config,
            slots,
            dispatcher,
            workflows: Workflows::new(),
            heartbeat,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Probe every slot on the sensor and rebuild the free pool.
    pub fn start(&mut self, hw: &mut impl Hardware, sink: &mut impl EventSink) {
        hw.notify(&["Scanning", "Fingerprint DB..."], None);
        self.slots = SlotAllocator::scan(hw, self.config.slot_capacity);
        let free = self.slots.available();
        info!("AppService started, {} free slots", free);
        hw.notify(&["DB Scan Complete!"], None);
        sink.emit(&AppEvent::Started { free_slots: free });
    }

    /// Write a fresh device node to the store.
    pub fn provision(
        &self,
        store: &mut impl RemoteStorePort,
        delay: &mut impl DelayNs,
    ) -> Result<()> {
        CommandChannel::new(store, delay, self.config.device_root.as_str()).provision()
    }

    /// Erase every template on the sensor and reset the pool.
    pub fn wipe_templates(&mut self, hw: &mut impl Hardware) -> Result<()> {
        hw.erase_all()?;
        self.slots = SlotAllocator::with_occupied(self.config.slot_capacity, &[]);
        warn!("all templates erased");
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control-loop iteration: heartbeat, envelope poll, then one
    /// step of whichever workflow is active.
    ///
    /// `hw` satisfies both [`FingerprintPort`](super::ports::FingerprintPort)
    /// and [`FeedbackPort`](super::ports::FeedbackPort), which avoids a
    /// double mutable borrow.
    pub fn tick(
        &mut self,
        hw: &mut impl Hardware,
        store: &mut impl RemoteStorePort,
        clock: &impl ClockPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        let channel = CommandChannel::new(store, delay, self.config.device_root.as_str())
            .with_reset_policy(self.config.reset_attempts, self.config.reset_backoff_ms);
        let mut ctx = WorkflowContext {
            channel,
            hw,
            clock,
            sink,
            slots: &mut self.slots,
            config: &self.config,
        };

        self.heartbeat.tick(&mut ctx);

        let busy = self.workflows.any_active();
        if let Some(cmd) = self.dispatcher.poll(busy, &mut ctx) {
            self.workflows.start(&cmd.kind, &cmd.result);
        }

        self.workflows.tick(&mut ctx);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn workflows(&self) -> &Workflows {
        &self.workflows
    }

    pub fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Whether a workflow is running.
    pub fn is_busy(&self) -> bool {
        self.workflows.any_active()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
