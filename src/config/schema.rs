//! Timing configuration schema
//!
//! The controller has exactly two interval constants, each used twice: once
//! as a guard threshold and once as a deferred delay. The pairing is crossed
//! (the 2000 ms guard belongs to the green half, whose deferred delay is
//! 3000 ms) and is kept as-is.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Guard threshold applied while `phase == true` (stable green).
pub const DEFAULT_GREEN_GUARD: Duration = Duration::from_millis(2000);

/// Guard threshold applied while `phase == false` (stable red).
pub const DEFAULT_RED_GUARD: Duration = Duration::from_millis(3000);

/// Delay before the red+yellow lamps hand over to green.
pub const DEFAULT_RED_TO_GREEN_DELAY: Duration = Duration::from_millis(2000);

/// Delay before the yellow lamp hands over to red.
pub const DEFAULT_GREEN_TO_RED_DELAY: Duration = Duration::from_millis(3000);

/// Longest guard, delay, or scripted press offset accepted.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Guard thresholds and deferred delays for the phase controller.
///
/// Durations are written in humantime syntax (`"2s"`, `"2500ms"`).
/// Missing fields take the defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TimingConfig {
    /// Minimum time since the last accepted request before a request made
    /// at stable green is accepted (strictly greater than).
    #[serde(default = "default_green_guard", with = "humantime_duration")]
    pub green_guard: Duration,

    /// Minimum time since the last accepted request before a request made
    /// at stable red is accepted (strictly greater than).
    #[serde(default = "default_red_guard", with = "humantime_duration")]
    pub red_guard: Duration,

    /// Delay of the deferred half of the red-to-green sequence.
    #[serde(default = "default_red_to_green_delay", with = "humantime_duration")]
    pub red_to_green_delay: Duration,

    /// Delay of the deferred half of the green-to-red sequence.
    #[serde(default = "default_green_to_red_delay", with = "humantime_duration")]
    pub green_to_red_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            green_guard: DEFAULT_GREEN_GUARD,
            red_guard: DEFAULT_RED_GUARD,
            red_to_green_delay: DEFAULT_RED_TO_GREEN_DELAY,
            green_to_red_delay: DEFAULT_GREEN_TO_RED_DELAY,
        }
    }
}

impl TimingConfig {
    /// Guard threshold for a request arriving while the controller is in
    /// the given phase.
    #[must_use]
    pub const fn guard_for(&self, phase: bool) -> Duration {
        if phase {
            self.green_guard
        } else {
            self.red_guard
        }
    }

    /// Deferred delay for a sequence started while the controller is in
    /// the given phase.
    #[must_use]
    pub const fn delay_for(&self, phase: bool) -> Duration {
        if phase {
            self.green_to_red_delay
        } else {
            self.red_to_green_delay
        }
    }

    /// Iterates `(field name, value)` pairs, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Duration)> {
        [
            ("green_guard", self.green_guard),
            ("red_guard", self.red_guard),
            ("red_to_green_delay", self.red_to_green_delay),
            ("green_to_red_delay", self.green_to_red_delay),
        ]
        .into_iter()
    }
}

const fn default_green_guard() -> Duration {
    DEFAULT_GREEN_GUARD
}

const fn default_red_guard() -> Duration {
    DEFAULT_RED_GUARD
}

const fn default_red_to_green_delay() -> Duration {
    DEFAULT_RED_TO_GREEN_DELAY
}

const fn default_green_to_red_delay() -> Duration {
    DEFAULT_GREEN_TO_RED_DELAY
}

/// Serde adapter for `Duration` fields written as humantime strings.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| de::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}
