//! Paths every command works against.
//!
//! The config directory holds both `config.yml` and the per-target state
//! directories. It is resolved once in `main` and passed down explicitly.

use crate::config::{default_config_dir, default_config_file, read_config, select_targets, Target};
use crate::error::Result;
use crate::known_hosts::default_known_hosts;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DroneContext {
    /// Configuration file to read.
    pub config_file: PathBuf,

    /// Root for per-target state directories.
    pub config_dir: PathBuf,

    /// ssh known_hosts file updated for remote repositories.
    pub known_hosts: PathBuf,
}

impl DroneContext {
    /// Resolve default locations, with `config_file` overriding the default
    /// `{config_dir}/config.yml`.
    pub fn resolve(config_file: Option<PathBuf>) -> Result<Self> {
        let config_dir = default_config_dir()?;
        let config_file = config_file.unwrap_or_else(|| default_config_file(&config_dir));
        Ok(Self {
            config_file,
            config_dir,
            known_hosts: default_known_hosts()?,
        })
    }

    /// Load the configuration and keep targets for the named archives.
    pub fn targets(&self, archives: &[String]) -> Result<Vec<Target>> {
        let targets = read_config(&self.config_file, &self.config_dir)?;
        select_targets(targets, archives)
    }
}
