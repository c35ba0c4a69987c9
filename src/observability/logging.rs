//! Logging initialization.
//!
//! Diagnostics go to stderr through `tracing`. `-v` raises the level of
//! this crate's own targets only; dependencies stay at `warn` so a
//! `-vvv` run shows controller decisions and timer firings, not runtime
//! internals. `TRAFFIC_LIGHT_LOG_LEVEL` replaces the whole filter.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorChoice, OutputFormat};

/// Environment variable that overrides the verbosity-derived filter.
pub const LOG_LEVEL_ENV: &str = "TRAFFIC_LIGHT_LOG_LEVEL";

/// Tracing target prefix of everything logged by this crate.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

impl From<OutputFormat> for LogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => Self::Human,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Builds the default filter directive.
///
/// `quiet` wins over `verbosity` and keeps only errors. Otherwise
/// everything logs at `warn` and this crate's targets are raised:
///
/// - 0 → `"warn"`
/// - 1 → `"warn,traffic_light=info"`
/// - 2 → `"warn,traffic_light=debug"`
/// - 3+ → `"warn,traffic_light=trace"`
#[must_use]
pub fn default_directive(verbosity: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_owned();
    }
    let level = match verbosity {
        0 => return "warn".to_owned(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,{CRATE_TARGET}={level}")
}

/// Initializes the global tracing subscriber on stderr.
///
/// If `TRAFFIC_LIGHT_LOG_LEVEL` is set it takes precedence over `verbosity`
/// and `quiet`. Uses `try_init()`, so later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, quiet: bool, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let show_target = verbosity >= 2;

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(show_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(use_ansi).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_keeps_only_errors() {
        assert_eq!(default_directive(0, true), "error");
        assert_eq!(default_directive(3, true), "error");
    }

    #[test]
    fn test_verbosity_raises_crate_targets_only() {
        assert_eq!(default_directive(0, false), "warn");
        assert_eq!(default_directive(1, false), "warn,traffic_light=info");
        assert_eq!(default_directive(2, false), "warn,traffic_light=debug");
        assert_eq!(default_directive(3, false), "warn,traffic_light=trace");
        assert_eq!(default_directive(255, false), "warn,traffic_light=trace");
    }

    #[test]
    fn test_directives_parse() {
        for (verbosity, quiet) in [(0, false), (2, false), (3, false), (1, true)] {
            let directive = default_directive(verbosity, quiet);
            assert!(
                EnvFilter::try_new(&directive).is_ok(),
                "bad directive {directive}"
            );
        }
    }

    #[test]
    fn test_log_format_from_output_format() {
        assert_eq!(LogFormat::from(OutputFormat::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(OutputFormat::Human), LogFormat::Human);
        assert_eq!(LogFormat::default(), LogFormat::Human);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(LogFormat::Human, 0, false, ColorChoice::Auto);
        init_logging(LogFormat::Json, 3, true, ColorChoice::Never);
    }
}
