//! Lamp model
//!
//! Three lamps with fixed colors. Their on/off state changes only through
//! [`LampSet::toggle`], which only the phase controller calls.

use serde::Serialize;

/// Identity of a lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LampColor {
    /// Top lamp
    Red,
    /// Middle lamp
    Yellow,
    /// Bottom lamp
    Green,
}

impl LampColor {
    /// All colors, top to bottom.
    pub const ALL: [Self; 3] = [Self::Red, Self::Yellow, Self::Green];

    /// Lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }
}

impl std::fmt::Display for LampColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Illumination of a single lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LampState {
    /// Dark
    #[default]
    Off,
    /// Illuminated
    Lit,
}

impl LampState {
    /// Returns the opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Off => Self::Lit,
            Self::Lit => Self::Off,
        }
    }

    /// Returns `true` for [`LampState::Lit`].
    #[must_use]
    pub const fn is_lit(self) -> bool {
        matches!(self, Self::Lit)
    }
}

impl std::fmt::Display for LampState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Off => "OFF",
            Self::Lit => "LIT",
        })
    }
}

/// Where a lamp configuration sits in the red/green cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Red only
    StableRed,
    /// Red and yellow, waiting to hand over to green
    YellowRising,
    /// Green only
    StableGreen,
    /// Yellow only, waiting to hand over to red
    YellowFalling,
}

impl Stage {
    /// Returns `true` for the two configurations with no transition in flight.
    #[must_use]
    pub const fn is_stable(self) -> bool {
        matches!(self, Self::StableRed | Self::StableGreen)
    }
}

/// Snapshot of all three lamps.
///
/// Subscribers receive copies; mutating a copy has no effect on the
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LampSet {
    red: LampState,
    yellow: LampState,
    green: LampState,
}

impl LampSet {
    /// Initial configuration: red lit, others dark.
    pub const STABLE_RED: Self = Self::new(LampState::Lit, LampState::Off, LampState::Off);

    /// Green lit, others dark.
    pub const STABLE_GREEN: Self = Self::new(LampState::Off, LampState::Off, LampState::Lit);

    /// Builds a lamp set from explicit states, top to bottom.
    #[must_use]
    pub const fn new(red: LampState, yellow: LampState, green: LampState) -> Self {
        Self { red, yellow, green }
    }

    /// State of the lamp with the given color.
    #[must_use]
    pub const fn get(&self, color: LampColor) -> LampState {
        match color {
            LampColor::Red => self.red,
            LampColor::Yellow => self.yellow,
            LampColor::Green => self.green,
        }
    }

    /// State of the red lamp.
    #[must_use]
    pub const fn red(&self) -> LampState {
        self.red
    }

    /// State of the yellow lamp.
    #[must_use]
    pub const fn yellow(&self) -> LampState {
        self.yellow
    }

    /// State of the green lamp.
    #[must_use]
    pub const fn green(&self) -> LampState {
        self.green
    }

    /// Flips one lamp.
    pub(crate) const fn toggle(&mut self, color: LampColor) {
        let lamp = match color {
            LampColor::Red => &mut self.red,
            LampColor::Yellow => &mut self.yellow,
            LampColor::Green => &mut self.green,
        };
        *lamp = lamp.toggled();
    }

    /// Classifies this configuration, or `None` for a combination outside
    /// the cycle (only reachable when deferred transitions overlap).
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match (self.red, self.yellow, self.green) {
            (LampState::Lit, LampState::Off, LampState::Off) => Some(Stage::StableRed),
            (LampState::Lit, LampState::Lit, LampState::Off) => Some(Stage::YellowRising),
            (LampState::Off, LampState::Off, LampState::Lit) => Some(Stage::StableGreen),
            (LampState::Off, LampState::Lit, LampState::Off) => Some(Stage::YellowFalling),
            _ => None,
        }
    }
}

impl Default for LampSet {
    fn default() -> Self {
        Self::STABLE_RED
    }
}

impl std::fmt::Display for LampSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "red={} yellow={} green={}",
            self.red, self.yellow, self.green
        )
    }
}
