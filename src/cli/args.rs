//! CLI argument definitions
//!
//! All Clap derive structs for `traffic-light` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::MAX_DURATION;

// ============================================================================
// Root CLI
// ============================================================================

/// Timed traffic light phase controller.
#[derive(Parser, Debug)]
#[command(name = "traffic-light", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and drop the human-readable lamp lines. JSON output
    /// on stdout and `--events` files are still written.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Diagnostic log format on stderr.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "TRAFFIC_LIGHT_LOG_FORMAT"
    )]
    pub log_format: OutputFormat,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRAFFIC_LIGHT_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the light interactively: every line on stdin presses "Change".
    Run(RunArgs),

    /// Press "Change" at scripted offsets and print the resulting timeline.
    Simulate(SimulateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Controller Commands
// ============================================================================

/// Options shared by every command that drives a controller.
#[derive(Args, Debug)]
pub struct ControllerArgs {
    /// Path to a YAML timing configuration file.
    #[arg(short, long, env = "TRAFFIC_LIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for lamp changes on stdout.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Also write the JSONL event stream to this file.
    #[arg(long, env = "TRAFFIC_LIGHT_EVENTS")]
    pub events: Option<PathBuf>,

    /// Serve Prometheus metrics on 127.0.0.1 at this port.
    #[arg(long, env = "TRAFFIC_LIGHT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Controller options.
    #[command(flatten)]
    pub controller: ControllerArgs,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Controller options.
    #[command(flatten)]
    pub controller: ControllerArgs,

    /// Offset from start at which to press "Change" (e.g. `0s`, `2500ms`).
    /// Repeat the flag or separate offsets with commas.
    #[arg(
        short,
        long = "press",
        required = true,
        value_delimiter = ',',
        value_parser = parse_press_offset
    )]
    pub presses: Vec<Duration>,
}

/// Parses a press offset in humantime syntax, capped at [`MAX_DURATION`].
fn parse_press_offset(value: &str) -> Result<Duration, String> {
    let offset = humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if offset > MAX_DURATION {
        return Err(format!(
            "offset must be at most {}",
            humantime::format_duration(MAX_DURATION)
        ));
    }
    Ok(offset)
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["traffic-light", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        assert_eq!(args.controller.format, OutputFormat::Human);
        assert!(args.controller.events.is_none());
        assert!(args.controller.metrics_port.is_none());
    }

    #[test]
    fn test_run_with_config_and_json() {
        let cli = Cli::try_parse_from([
            "traffic-light",
            "run",
            "--config",
            "timing.yaml",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        assert_eq!(args.controller.config, Some(PathBuf::from("timing.yaml")));
        assert_eq!(args.controller.format, OutputFormat::Json);
    }

    #[test]
    fn test_simulate_presses_parse() {
        let cli = Cli::try_parse_from([
            "traffic-light",
            "simulate",
            "--press",
            "0s",
            "--press",
            "2500ms,6s",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("Expected SimulateArgs");
        };
        assert_eq!(
            args.presses,
            vec![
                Duration::ZERO,
                Duration::from_millis(2500),
                Duration::from_secs(6)
            ]
        );
    }

    #[test]
    fn test_simulate_requires_press() {
        let result = Cli::try_parse_from(["traffic-light", "simulate"]);
        assert!(result.is_err(), "Expected error for missing --press");
    }

    #[test]
    fn test_simulate_rejects_bad_offset() {
        let result = Cli::try_parse_from(["traffic-light", "simulate", "--press", "later"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_simulate_rejects_offset_over_a_day() {
        let result =
            Cli::try_parse_from(["traffic-light", "simulate", "--press", "300000000000years"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["traffic-light", "simulate", "--press", "24h"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("Expected SimulateArgs");
        };
        assert_eq!(args.presses, vec![MAX_DURATION]);
    }

    #[test]
    fn test_help_output() {
        let result = Cli::try_parse_from(["traffic-light", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let result = Cli::try_parse_from(["traffic-light", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_color_choices_parse() {
        for variant in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["traffic-light", "--color", variant, "run"]);
            assert!(cli.is_ok(), "Failed to parse color={variant}");
        }
    }

    #[test]
    fn test_completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["traffic-light", "completions", shell]);
            assert!(cli.is_ok(), "Failed to parse shell={shell}");
        }
    }

    #[test]
    fn test_verbose_count_and_quiet() {
        let cli = Cli::try_parse_from(["traffic-light", "-vvv", "--quiet", "run"]).unwrap();
        assert_eq!(cli.verbose, 3);
        assert!(cli.quiet);
    }

    #[test]
    fn test_log_format_is_global() {
        let cli = Cli::try_parse_from(["traffic-light", "run", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, OutputFormat::Json);

        let cli = Cli::try_parse_from(["traffic-light", "run"]).unwrap();
        assert_eq!(cli.log_format, OutputFormat::Human);
    }
}
