//! Polled contact-bounce filter producing clean press/release edges.
//!
//! The button line is sampled at a fixed rate (default 10 ms) from the
//! poll timer. A level change is accepted only once the raw input has held
//! the new level for the full debounce window; any flicker inside the
//! window restarts the stability timer and is discarded.
//!
//! ```text
//! raw     ‾‾‾|_|‾|___________________|‾|_|‾‾‾‾‾‾‾‾
//! stable  ‾‾‾‾‾‾‾‾‾‾‾‾‾|_________________________|‾‾‾‾
//!                 ◀─ window ─▶               ◀─ window ─▶
//! ```
//!
//! All timestamps are milliseconds since boot truncated to `u32`; every
//! comparison uses wrapping arithmetic.

use crate::pins::{ActiveLevel, InputPin, Pull};

/// Identifier of an input line (its GPIO number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub i32);

/// Logical direction of an accepted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Press,
    Release,
}

/// A debounced edge on one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub line: LineId,
    pub direction: EdgeDirection,
    /// When the new level first appeared (start of the stable run).
    pub at_ms: u32,
}

/// Static description plus debounced state of one input line.
#[derive(Debug, Clone, Copy)]
pub struct InputLine {
    pub id: LineId,
    pub active: ActiveLevel,
    pub pull: Pull,
    /// Current debounced logical level (true = pressed).
    pub pressed: bool,
    /// Timestamp of the last accepted edge.
    pub last_edge_ms: Option<u32>,
}

impl InputLine {
    pub fn new(pin: InputPin) -> Self {
        Self {
            id: LineId(pin.gpio),
            active: pin.active,
            pull: pin.pull,
            pressed: false,
            last_edge_ms: None,
        }
    }
}

/// Debounce state machine for a single line.
pub struct EdgeDetector {
    line: InputLine,
    window_ms: u32,
    /// Raw logical level seen on the most recent sample and when it started.
    candidate: Option<(bool, u32)>,
}

impl EdgeDetector {
    pub fn new(line: InputLine, window_ms: u32) -> Self {
        Self {
            line,
            window_ms,
            candidate: None,
        }
    }

    pub fn line(&self) -> &InputLine {
        &self.line
    }

    /// Feed one raw electrical sample. Returns an edge once a new level has
    /// been stable for the debounce window.
    pub fn on_raw_sample(&mut self, raw_level: bool, now_ms: u32) -> Option<Edge> {
        let pressed = self.line.active.is_active(raw_level);

        let since = match self.candidate {
            Some((level, since)) if level == pressed => since,
            _ => {
                self.candidate = Some((pressed, now_ms));
                now_ms
            }
        };

        if pressed == self.line.pressed {
            return None;
        }
        if now_ms.wrapping_sub(since) < self.window_ms {
            return None;
        }

        self.line.pressed = pressed;
        self.line.last_edge_ms = Some(since);
        Some(Edge {
            line: self.line.id,
            direction: if pressed {
                EdgeDirection::Press
            } else {
                EdgeDirection::Release
            },
            at_ms: since,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::SONOFF_BASIC;

    // Sonoff button is active-low: raw `false` = pressed.
    const DOWN: bool = false;
    const UP: bool = true;

    fn detector() -> EdgeDetector {
        EdgeDetector::new(InputLine::new(SONOFF_BASIC.button), 30)
    }

    #[test]
    fn idle_line_emits_nothing() {
        let mut d = detector();
        for t in (0..200).step_by(10) {
            assert_eq!(d.on_raw_sample(UP, t), None);
        }
    }

    #[test]
    fn stable_press_emits_after_window() {
        let mut d = detector();
        assert_eq!(d.on_raw_sample(DOWN, 100), None);
        assert_eq!(d.on_raw_sample(DOWN, 110), None);
        assert_eq!(d.on_raw_sample(DOWN, 120), None);
        let e = d.on_raw_sample(DOWN, 130).unwrap();
        assert_eq!(e.direction, EdgeDirection::Press);
        assert_eq!(e.at_ms, 100);
        assert!(d.line().pressed);
        // No repeat while held.
        assert_eq!(d.on_raw_sample(DOWN, 140), None);
    }

    #[test]
    fn bounce_restarts_the_window() {
        let mut d = detector();
        d.on_raw_sample(DOWN, 0);
        d.on_raw_sample(UP, 20);
        d.on_raw_sample(DOWN, 25);
        assert_eq!(d.on_raw_sample(DOWN, 50), None);
        let e = d.on_raw_sample(DOWN, 55).unwrap();
        assert_eq!(e.at_ms, 25);
    }

    #[test]
    fn release_edge_follows_press() {
        let mut d = detector();
        d.on_raw_sample(DOWN, 0);
        d.on_raw_sample(DOWN, 30);
        d.on_raw_sample(UP, 200);
        let e = d.on_raw_sample(UP, 230).unwrap();
        assert_eq!(e.direction, EdgeDirection::Release);
        assert_eq!(d.line().last_edge_ms, Some(200));
    }

    #[test]
    fn survives_timer_wraparound() {
        let mut d = detector();
        let start = u32::MAX - 10;
        d.on_raw_sample(DOWN, start);
        let e = d.on_raw_sample(DOWN, start.wrapping_add(30)).unwrap();
        assert_eq!(e.at_ms, start);
    }
}
