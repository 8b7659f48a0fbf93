//! Error types for borg-drone.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Configuration problems are collected into a single [`ConfigValidationError`]
//! so that every defect in a file is reported in one run.

use crate::exit_codes;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Every distinct problem found while validating and resolving a configuration
/// document.
///
/// The set is never empty when this value is returned as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.errors))]
pub struct ConfigValidationError {
    pub errors: BTreeSet<String>,
}

impl ConfigValidationError {
    /// Returns `Err` carrying `errors` when it is non-empty.
    pub fn check(errors: BTreeSet<String>) -> std::result::Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    pub fn contains(&self, message: &str) -> bool {
        self.errors.contains(message)
    }

    /// Log every message at error level.
    pub fn log_errors(&self) {
        for error in &self.errors {
            tracing::error!("> {}", error);
        }
    }
}

fn describe(errors: &BTreeSet<String>) -> String {
    let lines: Vec<&str> = errors.iter().map(String::as_str).collect();
    format!(
        "{} error(s) in configuration:\n> {}",
        errors.len(),
        lines.join("\n> ")
    )
}

/// Main error type for borg-drone operations.
#[derive(Error, Debug)]
pub enum DroneError {
    /// The configuration file could not be read or decoded.
    #[error("failed to load configuration file '{}': {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    /// The configuration was decoded but is invalid.
    #[error(transparent)]
    ConfigValidation(#[from] ConfigValidationError),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// An external program exited unsuccessfully.
    #[error("command '{command}' failed with exit code {exit_code}")]
    Process { command: String, exit_code: i32 },

    /// Filesystem operation on local state failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DroneError {
    /// Wrap an I/O error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DroneError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DroneError::ConfigLoad { .. } => exit_codes::CONFIG_ERROR,
            DroneError::ConfigValidation(_) => exit_codes::CONFIG_ERROR,
            DroneError::UserError(_) => exit_codes::USER_ERROR,
            DroneError::Process { .. } => exit_codes::PROCESS_FAILURE,
            DroneError::Io { .. } => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for borg-drone operations.
pub type Result<T> = std::result::Result<T, DroneError>;
