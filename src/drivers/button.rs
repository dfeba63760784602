//! Polled button driver with single, double, long and very-long press detection.
//!
//! ## Hardware
//!
//! Momentary switch, polarity and pull taken from the board profile
//! (Sonoff Basic: active-low with pull-up on GPIO0). The poll timer calls
//! [`ButtonDriver::poll`] every `poll_interval_ms`; the
//! [`EdgeDetector`] filters bounce and the [`GestureClassifier`] turns
//! clean edges plus elapsed time into gestures.
//!
//! ## Gesture detection
//!
//! | Gesture   | Condition                                             |
//! |-----------|-------------------------------------------------------|
//! | Single    | held < 500ms, no second press within 400ms of release |
//! | Double    | two presses < 500ms, second within 400ms of release   |
//! | Long      | 500ms <= held < 4s, classified at release             |
//! | Very long | held >= 4s, classified at release                     |
//!
//! A press landing exactly on a threshold goes to the longer bucket.
//! Timeouts that depend on "no edge has arrived yet" are extended by the
//! debounce window (`settle_ms`), because an edge is only reported once
//! it has been stable that long.

use crate::app::ports::InputPort;
use crate::config::PlugConfig;
use crate::pins::InputPin;

use super::debounce::{Edge, EdgeDetector, EdgeDirection, InputLine, LineId};

/// Classified gesture kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Single,
    Double,
    Long,
    VeryLong,
}

/// A gesture recognised on a specific line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    pub line: LineId,
    pub kind: GestureKind,
    pub at_ms: u32,
}

/// Timing thresholds for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureThresholds {
    pub short_press_max_ms: u32,
    pub double_press_window_ms: u32,
    pub long_press_max_ms: u32,
    /// Edge reporting latency (the debounce window).
    pub settle_ms: u32,
}

impl GestureThresholds {
    pub fn from_config(cfg: &PlugConfig) -> Self {
        Self {
            short_press_max_ms: cfg.short_press_max_ms,
            double_press_window_ms: cfg.double_press_window_ms,
            long_press_max_ms: cfg.long_press_max_ms,
            settle_ms: cfg.debounce_ms,
        }
    }

    /// Bucket for a completed press. Boundaries go to the longer bucket.
    fn classify_held(&self, held_ms: u32) -> Option<GestureKind> {
        if held_ms >= self.long_press_max_ms {
            Some(GestureKind::VeryLong)
        } else if held_ms >= self.short_press_max_ms {
            Some(GestureKind::Long)
        } else {
            None
        }
    }
}

/// Transient state of one press sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressSession {
    /// Start of the press currently held (or last held).
    pub started_ms: u32,
    /// Presses seen in this multi-press window.
    pub presses: u8,
    pub last_release_ms: Option<u32>,
}

impl PressSession {
    fn begin(at_ms: u32) -> Self {
        Self {
            started_ms: at_ms,
            presses: 1,
            last_release_ms: None,
        }
    }
}

/// Internal state machine for gesture detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pressed(PressSession),
    ReleasedWaiting(PressSession),
    SecondPressed(PressSession),
}

/// Edge + time → gesture state machine for one line.
pub struct GestureClassifier {
    thresholds: GestureThresholds,
    state: GestureState,
    /// Second gesture produced by a single edge, handed out on the next poll.
    pending: Option<GestureKind>,
}

impl GestureClassifier {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            state: GestureState::Idle,
            pending: None,
        }
    }

    /// Current press session, if a sequence is in progress.
    pub fn session(&self) -> Option<PressSession> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Pressed(s)
            | GestureState::ReleasedWaiting(s)
            | GestureState::SecondPressed(s) => Some(s),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle && self.pending.is_none()
    }

    /// Feed a debounced edge.
    pub fn on_edge(&mut self, edge: &Edge) -> Option<GestureKind> {
        let t = self.thresholds;
        match (self.state, edge.direction) {
            (GestureState::Idle, EdgeDirection::Press) => {
                self.state = GestureState::Pressed(PressSession::begin(edge.at_ms));
                None
            }

            (GestureState::Pressed(s), EdgeDirection::Release) => {
                let held = edge.at_ms.wrapping_sub(s.started_ms);
                if let Some(kind) = t.classify_held(held) {
                    self.state = GestureState::Idle;
                    return Some(kind);
                }
                self.state = GestureState::ReleasedWaiting(PressSession {
                    last_release_ms: Some(edge.at_ms),
                    ..s
                });
                None
            }

            (GestureState::ReleasedWaiting(s), EdgeDirection::Press) => {
                let released = s.last_release_ms.unwrap_or(s.started_ms);
                let gap = edge.at_ms.wrapping_sub(released);
                if gap < t.double_press_window_ms {
                    self.state = GestureState::SecondPressed(PressSession {
                        started_ms: edge.at_ms,
                        presses: s.presses.saturating_add(1),
                        ..s
                    });
                    None
                } else {
                    // Window closed before this press; the first one stands alone.
                    self.state = GestureState::Pressed(PressSession::begin(edge.at_ms));
                    Some(GestureKind::Single)
                }
            }

            (GestureState::SecondPressed(s), EdgeDirection::Release) => {
                let held = edge.at_ms.wrapping_sub(s.started_ms);
                self.state = GestureState::Idle;
                match t.classify_held(held) {
                    None => Some(GestureKind::Double),
                    Some(kind) => {
                        self.pending = Some(kind);
                        Some(GestureKind::Single)
                    }
                }
            }

            // Repeated edges in the same direction (or a release seen while
            // idle, e.g. button held through boot) carry no information.
            _ => None,
        }
    }

    /// Advance the time-based transitions.
    pub fn poll(&mut self, now_ms: u32) -> Option<GestureKind> {
        if let Some(kind) = self.pending.take() {
            return Some(kind);
        }

        let t = self.thresholds;
        match self.state {
            GestureState::ReleasedWaiting(s) => {
                let released = s.last_release_ms.unwrap_or(s.started_ms);
                if now_ms.wrapping_sub(released) >= t.double_press_window_ms + t.settle_ms {
                    self.state = GestureState::Idle;
                    return Some(GestureKind::Single);
                }
                None
            }
            GestureState::SecondPressed(s) => {
                // Second press is already too long for a double: the first
                // press resolves as single, the second continues on its own.
                if now_ms.wrapping_sub(s.started_ms) >= t.short_press_max_ms + t.settle_ms {
                    self.state = GestureState::Pressed(PressSession::begin(s.started_ms));
                    return Some(GestureKind::Single);
                }
                None
            }
            GestureState::Idle | GestureState::Pressed(_) => None,
        }
    }
}

/// Debounce + classification for one physical button.
pub struct ButtonDriver {
    detector: EdgeDetector,
    classifier: GestureClassifier,
}

impl ButtonDriver {
    pub fn new(pin: InputPin, cfg: &PlugConfig) -> Self {
        Self {
            detector: EdgeDetector::new(InputLine::new(pin), cfg.debounce_ms),
            classifier: GestureClassifier::new(GestureThresholds::from_config(cfg)),
        }
    }

    /// GPIO line this button is attached to.
    pub fn line(&self) -> LineId {
        self.detector.line().id
    }

    /// Debounced logical state (true = pressed).
    pub fn is_pressed(&self) -> bool {
        self.detector.line().pressed
    }

    /// Sample the line through `input` and advance the state machines.
    pub fn poll(&mut self, input: &impl InputPort, now_ms: u32) -> Option<Gesture> {
        let raw = input.read_input(self.line().0);
        self.tick(raw, now_ms)
    }

    /// Feed one raw sample taken at `now_ms`.
    /// Returns at most one classified gesture per call.
    pub fn tick(&mut self, raw_level: bool, now_ms: u32) -> Option<Gesture> {
        let line = self.line();
        if let Some(edge) = self.detector.on_raw_sample(raw_level, now_ms) {
            if let Some(kind) = self.classifier.on_edge(&edge) {
                return Some(Gesture {
                    line,
                    kind,
                    at_ms: now_ms,
                });
            }
        }
        self.classifier.poll(now_ms).map(|kind| Gesture {
            line,
            kind,
            at_ms: now_ms,
        })
    }
}
