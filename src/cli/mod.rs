//! CLI argument parsing for borg-drone.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// borg-drone: declarative borg backups to local and remote repositories.
///
/// Archives (sets of paths) and repositories (backup destinations) are
/// declared in a YAML file; every archive/repository pair is a target.
#[derive(Parser, Debug)]
#[command(name = "borg-drone")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for borg-drone.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the program version.
    Version,

    /// Show the targets resolved from the configuration.
    Targets(TargetsArgs),

    /// Initialise repositories.
    ///
    /// Creates each target's state directory and password file, registers
    /// remote hosts in known_hosts, then runs `borg init`.
    Init(ArchiveArgs),

    /// Run `borg info` for each initialised target.
    Info(ArchiveArgs),

    /// Run `borg list` for each initialised target.
    List(ArchiveArgs),

    /// Create a backup for each initialised target.
    ///
    /// Followed by prune, compact and rclone upload where configured.
    Create(ArchiveArgs),

    /// Export repository keys into the target state directories.
    KeyExport(ArchiveArgs),

    /// Remove exported key files.
    KeyCleanup(ArchiveArgs),
}

/// Archive selection shared by every target command.
#[derive(Args, Debug, Clone, Default)]
pub struct ArchiveArgs {
    /// Archive names to act on. All archives when omitted.
    pub archives: Vec<String>,
}

/// Arguments for the `targets` command.
#[derive(Args, Debug)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub selection: ArchiveArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
