//! Reference resolution: expanding an archive's repository references into
//! merged repository documents.
//!
//! An archive may reference repositories as a plain list of names or as a
//! mapping of name to override attributes. Both forms are normalized to the
//! mapping form before anything else looks at them.

use super::render::{render, scalar_name};
use super::types::RepositoryType;
use super::validate::{override_document_errors, ArchiveDecl, Errors, RepositoryDecl};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// A repository document after an archive's overrides were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRepository {
    pub repo_type: RepositoryType,
    pub name: String,
    pub document: Mapping,
}

/// An archive together with every repository it resolved to, in reference order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArchive {
    pub name: String,
    pub document: Mapping,
    pub repositories: Vec<ResolvedRepository>,
}

/// Resolve the references of every archive against the declared repositories.
///
/// Unresolved names are reported and dropped. When a name is declared more
/// than once the first declaration is used; the duplicate itself is reported
/// by repository validation.
pub fn resolve_archives(
    repositories: &[RepositoryDecl],
    archives: &[ArchiveDecl],
    errors: &mut Errors,
) -> Vec<ResolvedArchive> {
    let mut index: BTreeMap<&str, &RepositoryDecl> = BTreeMap::new();
    for repo in repositories {
        index.entry(repo.name.as_str()).or_insert(repo);
    }

    archives
        .iter()
        .map(|archive| {
            let references =
                normalize_references(&archive.name, archive.document.get("repositories"), errors);
            let mut resolved = Vec::new();
            for (name, overrides) in references {
                let Some(base) = index.get(name.as_str()) else {
                    errors.insert(format!("Invalid repository reference: {name}"));
                    continue;
                };
                errors.extend(override_document_errors(&overrides));
                let mut document = merge(&base.document, &overrides);
                document.insert(Value::from("name"), Value::from(name.as_str()));
                resolved.push(ResolvedRepository {
                    repo_type: base.repo_type,
                    name,
                    document,
                });
            }
            tracing::debug!(
                archive = %archive.name,
                repositories = resolved.len(),
                "resolved repository references"
            );
            ResolvedArchive {
                name: archive.name.clone(),
                document: archive.document.clone(),
                repositories: resolved,
            }
        })
        .collect()
}

/// Normalize a `repositories` reference field to `(name, overrides)` pairs.
///
/// `[a, b]` becomes `[(a, {}), (b, {})]`; in the mapping form a `null` value
/// means no overrides. Repeated names keep their first position.
pub fn normalize_references(
    archive: &str,
    references: Option<&Value>,
    errors: &mut Errors,
) -> Vec<(String, Mapping)> {
    let mut normalized: Vec<(String, Mapping)> = Vec::new();
    let mut push = |name: String, overrides: Mapping| {
        if !normalized.iter().any(|(existing, _)| *existing == name) {
            normalized.push((name, overrides));
        }
    };

    match references {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(names)) => {
            for entry in names {
                match scalar_name(entry) {
                    Some(name) => push(name, Mapping::new()),
                    None => {
                        errors.insert(format!(
                            "Archive \"{archive}\" has invalid repository reference: {}",
                            render(entry)
                        ));
                    }
                }
            }
        }
        Some(Value::Mapping(map)) => {
            for (key, value) in map {
                let Some(name) = scalar_name(key) else {
                    errors.insert(format!(
                        "Archive \"{archive}\" has invalid repository reference: {}",
                        render(key)
                    ));
                    continue;
                };
                match value {
                    Value::Null => push(name, Mapping::new()),
                    Value::Mapping(overrides) => push(name, overrides.clone()),
                    other => {
                        errors.insert(format!(
                            "Archive \"{archive}\" has invalid overrides for repository \"{name}\": {}",
                            render(other)
                        ));
                    }
                }
            }
        }
        Some(other) => {
            errors.insert(format!(
                "Archive \"{archive}\" has invalid repositories reference: expected a list or mapping, found {}",
                render(other)
            ));
        }
    }
    normalized
}

/// Shallow merge: keys in `overrides` replace those in `base` wholesale.
pub fn merge(base: &Mapping, overrides: &Mapping) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
