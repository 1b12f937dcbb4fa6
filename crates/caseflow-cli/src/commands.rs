//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// caseflow: step registry and scenario runner for the probate back-office e2e suite
#[derive(Parser, Debug)]
#[command(name = "caseflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every registered step with its area and kind
    Steps(StepsArgs),

    /// Parse and validate feature files without running them
    Validate(ValidateArgs),

    /// Run feature files against the back-office in a browser
    Run(RunArgs),

    /// Show the resolved suite configuration (passwords redacted)
    Config(ConfigArgs),
}

/// Arguments for the steps command
#[derive(Parser, Debug)]
pub struct StepsArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Feature files (YAML)
    #[arg(required = true)]
    pub features: Vec<PathBuf>,

    /// Suite configuration file used to resolve default retries
    #[arg(short, long, env = "CASEFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Feature files (YAML)
    #[arg(required = true)]
    pub features: Vec<PathBuf>,

    /// Suite configuration file
    #[arg(short, long, env = "CASEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of features run concurrently
    #[arg(short = 'j', long, default_value = "1")]
    pub workers: usize,

    /// Output directory for reports (overrides configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Stop a feature attempt at its first exhausted scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Path to the chromium binary
    #[arg(long, env = "CHROME_PATH")]
    pub chromium: Option<String>,

    /// Launch chromium without its sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Suite configuration file
    #[arg(short, long, env = "CASEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Listing output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Text,
    /// JSON array
    Json,
}

/// Configuration output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_steps_json() {
            let cli = Cli::try_parse_from(["caseflow", "steps", "--format", "json"]).unwrap();
            match cli.command {
                Commands::Steps(args) => assert_eq!(args.format, OutputFormat::Json),
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_parse_run_options() {
            let cli = Cli::try_parse_from([
                "caseflow",
                "-vv",
                "run",
                "a.yaml",
                "b.yaml",
                "-j",
                "3",
                "--headed",
                "--fail-fast",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            match cli.command {
                Commands::Run(args) => {
                    assert_eq!(args.features.len(), 2);
                    assert_eq!(args.workers, 3);
                    assert!(args.headed);
                    assert!(args.fail_fast);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_validate_requires_files() {
            assert!(Cli::try_parse_from(["caseflow", "validate"]).is_err());
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli =
                Cli::try_parse_from(["caseflow", "steps", "-q", "--log-format", "json"]).unwrap();
            assert!(cli.quiet);
            assert_eq!(cli.log_format, LogFormat::Json);
        }
    }
}
