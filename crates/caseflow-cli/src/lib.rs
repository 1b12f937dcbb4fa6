//! caseflow CLI library
//!
//! Command-line surface over the caseflow step registry and runner: audit
//! the registered steps, validate feature files, run them in a browser and
//! show the resolved configuration.

#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ConfigFormat, LogFormat, OutputFormat, RunArgs,
    StepsArgs, ValidateArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
