//! Passive buzzer driver.
//!
//! Feeds the [`TonePlayer`] sequencer from the control loop and pushes
//! frequency changes to the LEDC channel only when the output changes.

use crate::feedback::{Tone, TonePlayer};

use super::hw_init;

pub struct Buzzer {
    player: TonePlayer,
    /// Frequency currently on the pin (`None` = silent).
    output: Option<u32>,
}

impl Default for Buzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buzzer {
    pub fn new() -> Self {
        Self {
            player: TonePlayer::new(),
            output: None,
        }
    }

    /// Start `tone`, interrupting whatever is playing.
    pub fn play(&mut self, tone: Tone) {
        self.player.play(tone);
        let first = self.player.tick(0);
        self.apply(first);
    }

    pub fn stop(&mut self) {
        self.player.stop();
        self.apply(None);
    }

    /// Advance the pattern by `delta_ms`.  Call once per loop iteration.
    pub fn tick(&mut self, delta_ms: u32) {
        let next = self.player.tick(delta_ms);
        self.apply(next);
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Frequency currently driven, for diagnostics.
    pub fn output(&self) -> Option<u32> {
        self.output
    }

    fn apply(&mut self, freq: Option<u32>) {
        if freq != self.output {
            hw_init::buzzer_set(freq);
            self.output = freq;
        }
    }
}
