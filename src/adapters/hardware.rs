//! Hardware adapter. Bridges the board peripherals to the domain ports.
//!
//! Owns the fingerprint sensor, the buzzer and the text panel and exposes
//! them as one [`Hardware`](crate::app::ports::Hardware) value.  This is the
//! only module that combines real peripherals; on host targets the buzzer
//! and panel drivers run their simulation paths.

use crate::app::ports::{
    Capture, CharBuffer, FeedbackPort, FingerprintPort, Occupancy, SearchHit, SensorError,
};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::display::TextPanel;
use crate::feedback::Tone;
use crate::slots::SlotId;

/// Concrete adapter combining the sensor and the feedback peripherals.
pub struct HardwareAdapter<S: FingerprintPort> {
    sensor: S,
    buzzer: Buzzer,
    panel: TextPanel,
}

impl<S: FingerprintPort> HardwareAdapter<S> {
    pub fn new(sensor: S, buzzer: Buzzer, panel: TextPanel) -> Self {
        Self {
            sensor,
            buzzer,
            panel,
        }
    }

    /// Advance the tone sequencer.  Call once per loop iteration.
    pub fn tick(&mut self, delta_ms: u32) {
        self.buzzer.tick(delta_ms);
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn panel(&self) -> &TextPanel {
        &self.panel
    }

    pub fn buzzer(&self) -> &Buzzer {
        &self.buzzer
    }
}

// ── FingerprintPort implementation ────────────────────────────

impl<S: FingerprintPort> FingerprintPort for HardwareAdapter<S> {
    fn capture(&mut self) -> Result<Capture, SensorError> {
        self.sensor.capture()
    }

    fn vectorize(&mut self, buffer: CharBuffer) -> Result<(), SensorError> {
        self.sensor.vectorize(buffer)
    }

    fn combine(&mut self) -> Result<(), SensorError> {
        self.sensor.combine()
    }

    fn search(&mut self) -> Result<SearchHit, SensorError> {
        self.sensor.search()
    }

    fn persist(&mut self, slot: SlotId) -> Result<(), SensorError> {
        self.sensor.persist(slot)
    }

    fn erase(&mut self, slot: SlotId) -> Result<(), SensorError> {
        self.sensor.erase(slot)
    }

    fn probe(&mut self, slot: SlotId) -> Result<Occupancy, SensorError> {
        self.sensor.probe(slot)
    }

    fn erase_all(&mut self) -> Result<(), SensorError> {
        self.sensor.erase_all()
    }
}

// ── FeedbackPort implementation ───────────────────────────────

impl<S: FingerprintPort> FeedbackPort for HardwareAdapter<S> {
    fn notify(&mut self, lines: &[&str], tone: Option<Tone>) {
        self.panel.show(lines);
        if let Some(t) = tone {
            self.buzzer.play(t);
        }
    }
}
