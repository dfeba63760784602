//! GPIO assignments for the supported plug board.
//!
//! Single source of truth: the controller, the button driver and the
//! peripheral init all read the active [`BoardProfile`] rather than
//! hard-coding pin numbers or polarities.
//!
//! Earlier board revisions shipped with two slightly different pin maps;
//! they are consolidated here into one parameterised profile.

/// Electrical level that means "active" on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLevel {
    High,
    Low,
}

impl ActiveLevel {
    /// Translate a logical on/off into the pin level to drive.
    pub const fn level_for(self, active: bool) -> bool {
        match self {
            Self::High => active,
            Self::Low => !active,
        }
    }

    /// Translate a raw pin level into the logical "active" value.
    pub const fn is_active(self, level: bool) -> bool {
        self.level_for(level)
    }
}

/// Internal pull resistor configuration for an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    Floating,
}

/// A digital output and the level that energises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPin {
    pub gpio: i32,
    pub active: ActiveLevel,
}

/// A digital input, its pull resistor and the level that means "pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPin {
    pub gpio: i32,
    pub pull: Pull,
    pub active: ActiveLevel,
}

/// Complete pin map of a plug board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardProfile {
    pub name: &'static str,
    /// Mains relay driver.
    pub relay: OutputPin,
    /// Status LED (mirrors the relay, also used for identify blinks).
    pub led: OutputPin,
    /// Front-panel push button.
    pub button: InputPin,
}

impl BoardProfile {
    /// Every GPIO configured as an output on this board.
    pub const fn outputs(&self) -> [OutputPin; 2] {
        [self.relay, self.led]
    }
}

// ---------------------------------------------------------------------------
// Sonoff Basic
// ---------------------------------------------------------------------------

/// Relay on GPIO12 (HIGH = closed), LED on GPIO13 sinking to GND
/// (LOW = lit), button on GPIO0 with pull-up (LOW = pressed).
pub const SONOFF_BASIC: BoardProfile = BoardProfile {
    name: "sonoff-basic",
    relay: OutputPin {
        gpio: 12,
        active: ActiveLevel::High,
    },
    led: OutputPin {
        gpio: 13,
        active: ActiveLevel::Low,
    },
    button: InputPin {
        gpio: 0,
        pull: Pull::Up,
        active: ActiveLevel::Low,
    },
};

/// Profile compiled into this firmware image.
pub const BOARD: BoardProfile = SONOFF_BASIC;
