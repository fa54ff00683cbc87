//! Text panel for the 128×64 OLED.
//!
//! Holds up to three lines of at most [`LINE_WIDTH`] characters, the most
//! the panel shows at text size 1 with the spacing used on this board.
//! Each update is mirrored to the log so the terminal can be followed over
//! the serial console.

use heapless::{String, Vec};
use log::info;

/// Lines shown at once.
pub const MAX_LINES: usize = 3;
/// Characters per line (128 px / 6 px per glyph).
pub const LINE_WIDTH: usize = 21;

pub type Line = String<LINE_WIDTH>;

#[derive(Debug, Default)]
pub struct TextPanel {
    lines: Vec<Line, MAX_LINES>,
    updates: u32,
}

impl TextPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the panel contents.  Extra lines are dropped and long lines
    /// truncated.
    pub fn show(&mut self, lines: &[&str]) {
        self.lines.clear();
        for text in lines.iter().take(MAX_LINES) {
            let mut line = Line::new();
            for c in text.chars() {
                if line.push(c).is_err() {
                    break;
                }
            }
            // At most MAX_LINES iterations, so this cannot overflow.
            let _ = self.lines.push(line);
        }
        self.updates = self.updates.wrapping_add(1);
        info!("OLED | {}", self.render());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Number of updates since boot.
    pub fn updates(&self) -> u32 {
        self.updates
    }

    fn render(&self) -> std::string::String {
        self.lines
            .iter()
            .map(Line::as_str)
            .collect::<std::vec::Vec<_>>()
            .join(" | ")
    }
}
