//! Audible feedback patterns and the non-blocking tone sequencer.
//!
//! Each [`Tone`] maps to a short list of [`ToneStep`]s.  [`TonePlayer`]
//! walks that list as time advances; the main loop calls `tick()` every
//! iteration and drives the buzzer with whatever frequency it returns, so a
//! 700 ms failure tone never stalls the control loop.
//!
//! | Tone         | Steps                                   |
//! |--------------|-----------------------------------------|
//! | Success      | 1800 Hz 150 ms                          |
//! | Failure      | 600 Hz 700 ms                           |
//! | Intermediate | 1200 Hz 120 ms, gap, 1200 Hz 120 ms     |
//! | Waiting      | 800 Hz 80 ms, gap, 800 Hz 80 ms         |
//! | Prompt       | 1000 Hz 100 ms, gap, 1500 Hz 80 ms      |
//! | Ready        | 1500, 1800, 2000 Hz rising triad        |

/// Named feedback tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Failure,
    Intermediate,
    Waiting,
    Prompt,
    Ready,
}

/// One beep followed by a silent gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneStep {
    pub freq_hz: u32,
    pub on_ms: u32,
    pub off_ms: u32,
}

const fn step(freq_hz: u32, on_ms: u32, off_ms: u32) -> ToneStep {
    ToneStep {
        freq_hz,
        on_ms,
        off_ms,
    }
}

const SUCCESS: [ToneStep; 1] = [step(1800, 150, 0)];
const FAILURE: [ToneStep; 1] = [step(600, 700, 0)];
const INTERMEDIATE: [ToneStep; 2] = [step(1200, 120, 50), step(1200, 120, 0)];
const WAITING: [ToneStep; 2] = [step(800, 80, 100), step(800, 80, 0)];
const PROMPT: [ToneStep; 2] = [step(1000, 100, 50), step(1500, 80, 0)];
const READY: [ToneStep; 3] = [step(1500, 100, 50), step(1800, 100, 50), step(2000, 150, 0)];

impl Tone {
    pub fn pattern(self) -> &'static [ToneStep] {
        match self {
            Self::Success => &SUCCESS,
            Self::Failure => &FAILURE,
            Self::Intermediate => &INTERMEDIATE,
            Self::Waiting => &WAITING,
            Self::Prompt => &PROMPT,
            Self::Ready => &READY,
        }
    }

    /// Total length of the pattern including gaps.
    pub fn duration_ms(self) -> u32 {
        self.pattern().iter().map(|s| s.on_ms + s.off_ms).sum()
    }
}

// ---------------------------------------------------------------------------
// TonePlayer
// ---------------------------------------------------------------------------

/// Plays one [`Tone`] at a time.  Starting a new tone cuts the old one off.
#[derive(Debug, Default)]
pub struct TonePlayer {
    current: Option<Tone>,
    elapsed_ms: u32,
}

impl TonePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self, tone: Tone) {
        self.current = Some(tone);
        self.elapsed_ms = 0;
    }

    pub fn stop(&mut self) {
        self.current = None;
        self.elapsed_ms = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Advance by `delta_ms` and return the frequency to output, or `None`
    /// for silence.
    pub fn tick(&mut self, delta_ms: u32) -> Option<u32> {
        let tone = self.current?;
        let position = self.elapsed_ms;
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);

        let mut start = 0u32;
        for s in tone.pattern() {
            if position < start + s.on_ms {
                return Some(s.freq_hz);
            }
            if position < start + s.on_ms + s.off_ms {
                return None;
            }
            start += s.on_ms + s.off_ms;
        }

        self.current = None;
        None
    }
}
