//! Configuration model for borg-drone.
//!
//! A configuration file declares named repositories (under
//! `repositories.local` / `repositories.remote`) and named archives that
//! reference them. Parsing turns that document into [`Target`]s, one per
//! (archive, repository) pair, collecting every problem it finds along the way
//! instead of stopping at the first.

mod load;
mod render;
pub mod resolve;
pub mod target;
pub mod types;
pub mod validate;


use crate::error::ConfigValidationError;
use serde_yaml::Value;
use std::path::Path;
use validate::Errors;

// Re-export public API
pub(crate) use render::render_list;
pub use load::{default_config_dir, default_config_file, load_document, read_config, select_targets};
pub use target::{build_targets, Environment, Target};
pub use types::{Archive, PruneOptions, Repository, RepositoryKind, RepositoryType};

/// Check a decoded document without building targets.
///
/// Runs every structural, referential and schema check and fails with the
/// complete set of messages if any of them found a problem.
pub fn validate_config(document: &Value) -> Result<(), ConfigValidationError> {
    let mut errors = Errors::new();
    check(document, &mut errors);
    ConfigValidationError::check(errors)
}

/// Validate, resolve and materialize a decoded document.
///
/// State directories are computed under `config_dir` but not created.
pub fn parse_config(
    document: &Value,
    config_dir: &Path,
) -> Result<Vec<Target>, ConfigValidationError> {
    let mut errors = Errors::new();
    let archives = check(document, &mut errors);
    let targets = build_targets(&archives, config_dir, &mut errors);
    ConfigValidationError::check(errors)?;
    tracing::debug!(targets = targets.len(), "configuration parsed");
    Ok(targets)
}

fn check(document: &Value, errors: &mut Errors) -> Vec<resolve::ResolvedArchive> {
    let sections = validate::read_sections(document, errors);
    validate::check_repositories(&sections.repositories, errors);
    validate::check_archives(&sections.archives, errors);
    resolve::resolve_archives(&sections.repositories, &sections.archives, errors)
}
