//! Config file location and loading.

use super::render::render_list;
use super::{parse_config, Target};
use crate::error::{DroneError, Result};
use serde_yaml::Value;
use std::env;
use std::path::{Path, PathBuf};

/// Directory name under the user's config home.
pub const APP_DIR_NAME: &str = "borg-drone";

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// `$XDG_CONFIG_HOME/borg-drone`, or `~/.config/borg-drone` when unset.
///
/// Computed once by the caller and passed down; target state directories live
/// here too.
pub fn default_config_dir() -> Result<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => dirs::home_dir()
            .ok_or_else(|| {
                DroneError::UserError("could not determine the home directory".to_string())
            })?
            .join(".config"),
    };
    Ok(base.join(APP_DIR_NAME))
}

pub fn default_config_file(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read and decode a YAML config file into a generic document.
///
/// Failures here are load errors, never validation errors.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|e| DroneError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_yaml::from_str(&content).map_err(|e| DroneError::ConfigLoad {
        path: path.to_path_buf(),
        reason: format!("invalid YAML: {e}"),
    })
}

/// Load a config file and turn it into targets.
pub fn read_config<P: AsRef<Path>>(path: P, config_dir: &Path) -> Result<Vec<Target>> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "reading configuration");
    let document = load_document(path)?;
    Ok(parse_config(&document, config_dir)?)
}

/// Keep targets whose archive is named in `names`; an empty list keeps all.
pub fn select_targets(targets: Vec<Target>, names: &[String]) -> Result<Vec<Target>> {
    let selected: Vec<Target> = targets
        .into_iter()
        .filter(|t| names.is_empty() || names.contains(&t.archive.name))
        .collect();

    if selected.is_empty() {
        return Err(DroneError::UserError(format!(
            "No targets found matching names: {}",
            render_list(names)
        )));
    }
    Ok(selected)
}
