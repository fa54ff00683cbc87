//! Mock adapters for integration tests.
//!
//! `MockHardware` scripts sensor outcomes and records every feedback call;
//! `MockStore` wraps a [`DocumentTree`] with failure injection.  `Rig`
//! bundles them with an [`AppService`] so a test can play the remote actor
//! and advance the control loop tick by tick.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashSet, VecDeque};

use biomark::adapters::rtdb::DocumentTree;
use biomark::app::events::AppEvent;
use biomark::app::ports::{
    Capture, CharBuffer, ClockPort, EventSink, FeedbackPort, FingerprintPort, Occupancy,
    RemoteStorePort, SearchHit, SensorError, StoreError,
};
use biomark::app::service::AppService;
use biomark::config::SystemConfig;
use biomark::feedback::Tone;
use biomark::slots::SlotId;
use embedded_hal::delay::DelayNs;
use serde_json::{Value, json};

pub const ROOT: &str = "FingerScanner1";

// ── Sensor call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCall {
    Capture,
    Vectorize(CharBuffer),
    Combine,
    Search,
    Persist(SlotId),
    Erase(SlotId),
    EraseAll,
}

// ── MockHardware ──────────────────────────────────────────────

/// Sensor + feedback double.
///
/// Queued results are consumed one per call; an empty queue falls back to
/// the happy path (`NoFinger` for capture, `NotFound` for search, `Ok` for
/// everything else).  Probe answers come from `occupied`.
#[derive(Default)]
pub struct MockHardware {
    pub captures: VecDeque<Result<Capture, SensorError>>,
    pub vectorize_results: VecDeque<Result<(), SensorError>>,
    pub combine_results: VecDeque<Result<(), SensorError>>,
    pub search_results: VecDeque<Result<SearchHit, SensorError>>,
    pub persist_results: VecDeque<Result<(), SensorError>>,
    pub erase_results: VecDeque<Result<(), SensorError>>,
    pub occupied: HashSet<SlotId>,
    pub calls: Vec<SensorCall>,
    pub notifications: Vec<(Vec<String>, Option<Tone>)>,
}

impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_occupied(slots: &[SlotId]) -> Self {
        Self {
            occupied: slots.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queue `n` successful image captures.
    pub fn fingers(&mut self, n: usize) {
        for _ in 0..n {
            self.captures.push_back(Ok(Capture::Image));
        }
    }

    pub fn count(&self, call: SensorCall) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    /// True if any notification so far showed `line`.
    pub fn showed(&self, line: &str) -> bool {
        self.notifications
            .iter()
            .any(|(lines, _)| lines.iter().any(|l| l == line))
    }

    pub fn last_lines(&self) -> Vec<String> {
        self.notifications
            .last()
            .map(|(lines, _)| lines.clone())
            .unwrap_or_default()
    }
}

impl FingerprintPort for MockHardware {
    fn capture(&mut self) -> Result<Capture, SensorError> {
        self.calls.push(SensorCall::Capture);
        self.captures.pop_front().unwrap_or(Ok(Capture::NoFinger))
    }

    fn vectorize(&mut self, buffer: CharBuffer) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Vectorize(buffer));
        self.vectorize_results.pop_front().unwrap_or(Ok(()))
    }

    fn combine(&mut self) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Combine);
        self.combine_results.pop_front().unwrap_or(Ok(()))
    }

    fn search(&mut self) -> Result<SearchHit, SensorError> {
        self.calls.push(SensorCall::Search);
        self.search_results.pop_front().unwrap_or(Ok(SearchHit::NotFound))
    }

    fn persist(&mut self, slot: SlotId) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Persist(slot));
        let r = self.persist_results.pop_front().unwrap_or(Ok(()));
        if r.is_ok() {
            self.occupied.insert(slot);
        }
        r
    }

    fn erase(&mut self, slot: SlotId) -> Result<(), SensorError> {
        self.calls.push(SensorCall::Erase(slot));
        let r = self.erase_results.pop_front().unwrap_or(Ok(()));
        if r.is_ok() {
            self.occupied.remove(&slot);
        }
        r
    }

    fn probe(&mut self, slot: SlotId) -> Result<Occupancy, SensorError> {
        Ok(if self.occupied.contains(&slot) {
            Occupancy::Occupied
        } else {
            Occupancy::Empty
        })
    }

    fn erase_all(&mut self) -> Result<(), SensorError> {
        self.calls.push(SensorCall::EraseAll);
        self.occupied.clear();
        Ok(())
    }
}

impl FeedbackPort for MockHardware {
    fn notify(&mut self, lines: &[&str], tone: Option<Tone>) {
        let lines = lines.iter().map(|l| (*l).to_string()).collect();
        self.notifications.push((lines, tone));
    }
}

// ── MockStore ─────────────────────────────────────────────────

/// Remote store double.  `fail_reads` / `fail_writes` make the next `n`
/// calls fail with a transport error.
pub struct MockStore {
    pub tree: DocumentTree,
    pub ready: bool,
    pub fail_reads: u32,
    pub fail_writes: u32,
    pub writes: Vec<String>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self {
            tree: DocumentTree::new(),
            ready: true,
            fail_reads: 0,
            fail_writes: 0,
            writes: Vec::new(),
        }
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `rel` under the device root.
    pub fn at(&self, rel: &str) -> Option<&Value> {
        self.tree.get(&format!("/{ROOT}/{rel}"))
    }

    pub fn put(&mut self, rel: &str, value: Value) {
        self.tree.set(&format!("/{ROOT}/{rel}"), value);
    }

    pub fn wrote(&self, rel: &str) -> bool {
        let path = format!("/{ROOT}/{rel}");
        self.writes.iter().any(|w| *w == path)
    }
}

impl RemoteStorePort for MockStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(StoreError::Transport);
        }
        Ok(self.tree.get(path).cloned())
    }

    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(StoreError::Transport);
        }
        self.writes.push(path.to_string());
        self.tree.set(path, value.clone());
        Ok(())
    }
}

// ── Clock / delay / sink ──────────────────────────────────────

/// Uptime advances only when told to; wall time follows it from `unix_base`.
pub struct FixedClock {
    pub uptime: Cell<u64>,
    pub unix_base: Cell<Option<u64>>,
}

pub const BOOT_UNIX: u64 = 1_700_000_000;

impl FixedClock {
    pub fn new() -> Self {
        Self {
            uptime: Cell::new(0),
            unix_base: Cell::new(Some(BOOT_UNIX)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.uptime.set(self.uptime.get() + ms);
    }

    pub fn unsync(&self) {
        self.unix_base.set(None);
    }
}

impl ClockPort for FixedClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime.get()
    }

    fn unix_time(&self) -> Option<u64> {
        self.unix_base.get().map(|base| base + self.uptime.get() / 1_000)
    }
}

#[derive(Default)]
pub struct NoopDelay {
    pub waits: u32,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, _ms: u32) {
        self.waits += 1;
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Test config: a small library so boot scans stay cheap.
pub fn test_config() -> SystemConfig {
    SystemConfig {
        slot_capacity: 10,
        ..SystemConfig::default()
    }
}

pub struct Rig {
    pub app: AppService,
    pub hw: MockHardware,
    pub store: MockStore,
    pub clock: FixedClock,
    pub delay: NoopDelay,
    pub sink: RecordingSink,
}

impl Rig {
    pub fn new(hw: MockHardware) -> Self {
        Self::with_config(test_config(), hw)
    }

    /// Boot the service and provision an idle envelope.
    pub fn with_config(config: SystemConfig, mut hw: MockHardware) -> Self {
        let mut app = AppService::new(config);
        let mut sink = RecordingSink::default();
        let mut store = MockStore::new();
        let mut delay = NoopDelay::default();
        app.start(&mut hw, &mut sink);
        app.provision(&mut store, &mut delay)
            .expect("provision on a healthy store");
        Self {
            app,
            hw,
            store,
            clock: FixedClock::new(),
            delay,
            sink,
        }
    }

    /// Play the remote actor: post a pending command.
    pub fn post(&mut self, kind: &str, data: Value) {
        self.store.put("Command/Type", json!(kind));
        self.store.put("Command/Data", data);
        self.store.put("Command/Cancelled", json!(false));
        self.store.put("Command/Status", json!("pending"));
    }

    pub fn cancel(&mut self) {
        self.store.put("Command/Cancelled", json!(true));
    }

    /// One control-loop iteration, spaced one poll interval after the last.
    pub fn tick(&mut self) {
        let interval = u64::from(self.app.config().command_poll_interval_ms);
        self.tick_after(interval);
    }

    /// One iteration `ms` after the last, for interval checks.
    pub fn tick_after(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.app.tick(
            &mut self.hw,
            &mut self.store,
            &self.clock,
            &mut self.delay,
            &mut self.sink,
        );
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Tick until no workflow is active, up to `limit` ticks.
    pub fn run_to_idle(&mut self, limit: usize) {
        for _ in 0..limit {
            self.tick();
            if !self.app.is_busy() {
                return;
            }
        }
        panic!("workflow still active after {limit} ticks");
    }

    pub fn status(&self) -> Option<&str> {
        self.store.at("Command/Status").and_then(Value::as_str)
    }

    pub fn command_type(&self) -> Option<&str> {
        self.store.at("Command/Type").and_then(Value::as_str)
    }
}
