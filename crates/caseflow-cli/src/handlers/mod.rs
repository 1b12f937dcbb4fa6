//! Command handlers - one module per subcommand
//!
//! Each handler module contains the execution logic for a command plus the
//! pure helpers it renders with, so both can be tested without a terminal.

pub mod config;
pub mod run;
pub mod steps;
pub mod validate;

pub use config::{execute_config, load_suite_config, render_config};
pub use run::execute_run;
pub use steps::{execute_steps, render_steps_text};
pub use validate::{execute_validate, validate_feature_file};
