//! caseflow CLI: audit, validate and run back-office e2e features
//!
//! ## Usage
//!
//! ```bash
//! caseflow steps                                # List registered steps
//! caseflow validate demos/features/*.yaml       # Check feature files
//! caseflow run demos/features/*.yaml -j 2       # Run in chromium
//! caseflow config --config demos/config.yaml    # Show resolved config
//! ```

use caseflow_cli::{handlers, logging, Cli, CliConfig, CliResult, Commands, Printer, Verbosity};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config)?;

    let mut printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());
    match cli.command {
        Commands::Steps(args) => handlers::execute_steps(&args),
        Commands::Validate(args) => handlers::execute_validate(&args, &printer),
        Commands::Run(args) => handlers::execute_run(&args, &config, &mut printer),
        Commands::Config(args) => handlers::execute_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format)
}
