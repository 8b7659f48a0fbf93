//! borg-drone: declarative borg backups driven by a YAML configuration.
//!
//! This is the main entry point for the `borg-drone` CLI. It parses arguments,
//! installs logging, dispatches to the appropriate command handler, and maps
//! errors to exit codes.

mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod known_hosts;
pub mod runner;

#[cfg(test)]
mod test_support;

use cli::Cli;
use context::DroneContext;
use error::{DroneError, Result};
use runner::ProcessRunner;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            match &err {
                DroneError::ConfigValidation(invalid) => {
                    tracing::error!(
                        "Error(s) encountered while reading configuration file: {} error(s)",
                        invalid.errors.len()
                    );
                    invalid.log_errors();
                }
                other => tracing::error!("{}", other),
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = DroneContext::resolve(cli.config_file)?;
    commands::dispatch(cli.command, &ctx, &ProcessRunner)
}
