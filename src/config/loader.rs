//! Timing configuration loader
//!
//! Loading pipeline:
//! 1. Read the file (a missing file is reported as such, not as I/O)
//! 2. YAML parsing into [`TimingConfig`]
//! 3. Validation

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::schema::{MAX_DURATION, TimingConfig};
use crate::error::{ConfigError, TrafficLightError};

/// Path label used for configuration parsed from an in-memory string.
const INLINE_SOURCE: &str = "<inline>";

impl TimingConfig {
    /// Parses and validates a timing configuration from YAML text.
    ///
    /// An empty document yields the default timing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for malformed YAML or durations and
    /// `ConfigError::InvalidValue` when validation fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        parse(yaml, Path::new(INLINE_SOURCE))
    }

    /// Rejects zero durations and durations over [`MAX_DURATION`].
    ///
    /// A zero guard would accept every request and a zero delay would fire
    /// the deferred half in the same tick as the immediate one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.fields() {
            if value.is_zero() || value > MAX_DURATION {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: humantime::format_duration(value).to_string(),
                    expected: format!(
                        "a non-zero duration of at most {}",
                        humantime::format_duration(MAX_DURATION)
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Loads the timing configuration from `path`.
///
/// # Errors
///
/// Returns `ConfigError::MissingFile` if the file does not exist,
/// `TrafficLightError::Io` if it cannot be read, and the parse or
/// validation errors of [`TimingConfig::from_yaml_str`] otherwise.
pub fn load_timing(path: &Path) -> Result<TimingConfig, TrafficLightError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    let timing = parse(&text, path)?;
    debug!(path = %path.display(), ?timing, "loaded timing configuration");
    Ok(timing)
}

/// Resolves the timing for an optional `--config` path.
///
/// # Errors
///
/// Propagates errors from [`load_timing`].
pub fn resolve_timing(path: Option<&Path>) -> Result<TimingConfig, TrafficLightError> {
    path.map_or_else(|| Ok(TimingConfig::default()), load_timing)
}

fn parse(yaml: &str, path: &Path) -> Result<TimingConfig, ConfigError> {
    let timing = if yaml.trim().is_empty() {
        TimingConfig::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?
    };
    timing.validate()?;
    Ok(timing)
}
