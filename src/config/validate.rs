//! Structural validation of a decoded configuration document.
//!
//! Every check runs independently and records its findings in a shared error
//! set; nothing here stops at the first problem. The sections read here feed
//! reference resolution, which reports into the same set.

use super::render::{render, render_list, render_set, scalar_name};
use super::types::{PruneOptions, RepositoryType};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Distinct, human-readable validation messages.
pub type Errors = BTreeSet<String>;

/// Top-level keys every document must carry.
pub const REQUIRED_KEYS: [&str; 2] = ["archives", "repositories"];

/// A repository as declared under `repositories.<type>.<name>`.
///
/// `document` already carries `name`, taken from the mapping key.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryDecl {
    pub repo_type: RepositoryType,
    pub name: String,
    pub document: Mapping,
}

/// An archive as declared under `archives.<name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDecl {
    pub name: String,
    pub document: Mapping,
}

/// The two sections of a document, flattened into declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub repositories: Vec<RepositoryDecl>,
    pub archives: Vec<ArchiveDecl>,
}

/// Read both sections, reporting shape problems.
///
/// Missing or `null` sections read as empty.
pub fn read_sections(document: &Value, errors: &mut Errors) -> Sections {
    let empty = Mapping::new();
    let root = match document {
        Value::Mapping(map) => map,
        Value::Null => &empty,
        other => {
            errors.insert(format!(
                "Configuration must be a mapping, found {}",
                render(other)
            ));
            &empty
        }
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !root.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        errors.insert(format!("Missing required keys: {}", render_list(&missing)));
    }

    let repositories = read_repositories(root.get("repositories"), errors);
    if repositories.is_empty() {
        errors.insert("No repositories were defined".to_string());
    }
    let archives = read_archives(root.get("archives"), errors);

    Sections {
        repositories,
        archives,
    }
}

fn read_repositories(section: Option<&Value>, errors: &mut Errors) -> Vec<RepositoryDecl> {
    let Some(section) = as_mapping(section, "repositories", errors) else {
        return Vec::new();
    };

    let mut invalid_types: Vec<String> = Vec::new();
    let mut namespaces: BTreeMap<RepositoryType, &Value> = BTreeMap::new();
    for (key, value) in section {
        let name = scalar_name(key).unwrap_or_else(|| render(key));
        match RepositoryType::from_str(&name) {
            Some(repo_type) => {
                namespaces.insert(repo_type, value);
            }
            None => invalid_types.push(name),
        }
    }
    if !invalid_types.is_empty() {
        invalid_types.sort();
        errors.insert(format!(
            "Invalid repository types: {}",
            render_set(&invalid_types)
        ));
    }

    let mut repositories = Vec::new();
    for repo_type in RepositoryType::ALL {
        let path = format!("repositories.{}", repo_type.as_str());
        let Some(entries) = as_mapping(namespaces.get(&repo_type).copied(), &path, errors) else {
            continue;
        };
        for (key, value) in entries {
            let Some(name) = section_key(key, &path, errors) else {
                continue;
            };
            let Some(mut document) =
                as_mapping(Some(value), &format!("{path}.{name}"), errors).cloned()
            else {
                continue;
            };
            document.insert(Value::from("name"), Value::from(name.as_str()));
            repositories.push(RepositoryDecl {
                repo_type,
                name,
                document,
            });
        }
    }
    repositories
}

fn read_archives(section: Option<&Value>, errors: &mut Errors) -> Vec<ArchiveDecl> {
    let Some(section) = as_mapping(section, "archives", errors) else {
        return Vec::new();
    };

    let mut archives = Vec::new();
    for (key, value) in section {
        let Some(name) = section_key(key, "archives", errors) else {
            continue;
        };
        if let Some(document) = as_mapping(Some(value), &format!("archives.{name}"), errors) {
            archives.push(ArchiveDecl {
                name,
                document: document.clone(),
            });
        }
    }
    archives
}

/// Check repository declarations: name uniqueness and per-document rules.
pub fn check_repositories(repositories: &[RepositoryDecl], errors: &mut Errors) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for repo in repositories {
        *seen.entry(repo.name.as_str()).or_default() += 1;
    }
    for (name, count) in seen {
        if count > 1 {
            errors.insert(format!("Duplicate repository name: {name}"));
        }
    }

    for repo in repositories {
        errors.extend(repository_document_errors(
            repo.repo_type,
            &repo.name,
            &repo.document,
        ));
    }
}

/// Check archive declarations for their required attributes.
pub fn check_archives(archives: &[ArchiveDecl], errors: &mut Errors) {
    for archive in archives {
        for field in ["paths", "repositories"] {
            if !archive.document.contains_key(field) {
                errors.insert(format!(
                    "Archive \"{}\" is missing attribute \"{}\"",
                    archive.name, field
                ));
            }
        }
    }
}

/// Every rule a single repository document must satisfy.
pub fn repository_document_errors(
    repo_type: RepositoryType,
    name: &str,
    document: &Mapping,
) -> Vec<String> {
    let mut found: Vec<String> = repo_type
        .required_fields()
        .iter()
        .filter(|field| !document.contains_key(**field))
        .map(|field| format!("Repository \"{name}\" is missing attribute \"{field}\""))
        .collect();
    found.extend(override_document_errors(document));
    found
}

/// Rules that apply to any repository attribute set, including per-archive overrides.
pub fn override_document_errors(document: &Mapping) -> Vec<String> {
    let mut found = Vec::new();
    if let Some(prune) = document.get("prune") {
        found.extend(prune_error(prune));
    }
    if let Some(upload) = document.get("rclone_upload_path") {
        found.extend(rclone_upload_path_error(upload));
    }
    found
}

/// Report prune entries whose keys are not recognized.
fn prune_error(prune: &Value) -> Option<String> {
    let offending: Vec<Value> = match prune {
        Value::Null => Vec::new(),
        Value::Sequence(entries) => entries
            .iter()
            .filter(|entry| !is_valid_prune_entry(entry))
            .cloned()
            .collect(),
        other => vec![other.clone()],
    };
    if offending.is_empty() {
        None
    } else {
        Some(format!(
            "Invalid prune options: {}",
            render(&Value::Sequence(offending))
        ))
    }
}

fn is_valid_prune_entry(entry: &Value) -> bool {
    match entry {
        Value::Mapping(map) => map.keys().all(|key| {
            key.as_str()
                .map(PruneOptions::is_valid_key)
                .unwrap_or(false)
        }),
        _ => false,
    }
}

/// An upload path is `remote:subpath`; empty or absent disables uploading.
fn rclone_upload_path_error(upload: &Value) -> Option<String> {
    let text = match upload {
        Value::Null => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => s.clone(),
        other => render(other),
    };
    if text.matches(':').count() == 1 && upload.is_string() {
        None
    } else {
        Some(format!(
            "Invalid rclone_upload_path \"{text}\". Path must contain a single colon"
        ))
    }
}

fn as_mapping<'a>(value: Option<&'a Value>, path: &str, errors: &mut Errors) -> Option<&'a Mapping> {
    static EMPTY: std::sync::LazyLock<Mapping> = std::sync::LazyLock::new(Mapping::new);
    match value {
        None | Some(Value::Null) => Some(&*EMPTY),
        Some(Value::Mapping(map)) => Some(map),
        Some(Value::Tagged(tagged)) => as_mapping(Some(&tagged.value), path, errors),
        Some(_) => {
            errors.insert(format!("Section \"{path}\" must be a mapping"));
            None
        }
    }
}

fn section_key(key: &Value, path: &str, errors: &mut Errors) -> Option<String> {
    let name = scalar_name(key);
    if name.is_none() {
        errors.insert(format!(
            "Section \"{path}\" has an invalid name: {}",
            render(key)
        ));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn reads_sections_in_declaration_order() {
        let mut errors = Errors::new();
        let sections = read_sections(
            &doc(r#"
repositories:
  remote:
    b: {hostname: h, encryption: none}
  local:
    a: {path: /a, encryption: none}
archives:
  x: {paths: [/x], repositories: [a]}
"#),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        let names: Vec<&str> = sections.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            sections.repositories[0].document.get("name"),
            Some(&Value::from("a"))
        );
        assert_eq!(sections.archives.len(), 1);
    }

    #[test]
    fn null_namespaces_read_as_empty() {
        let mut errors = Errors::new();
        let sections = read_sections(
            &doc("repositories:\n  local:\n  remote:\narchives:\n"),
            &mut errors,
        );
        assert!(sections.repositories.is_empty());
        assert_eq!(
            errors,
            Errors::from(["No repositories were defined".to_string()])
        );
    }

    #[test]
    fn non_mapping_sections_are_reported() {
        let mut errors = Errors::new();
        read_sections(
            &doc("repositories:\n  local: [usb]\narchives: []\n"),
            &mut errors,
        );
        assert!(errors.contains("Section \"repositories.local\" must be a mapping"));
        assert!(errors.contains("Section \"archives\" must be a mapping"));
    }

    #[test]
    fn non_mapping_root_is_reported() {
        let mut errors = Errors::new();
        read_sections(&doc("- a\n- b\n"), &mut errors);
        assert!(errors.contains("Configuration must be a mapping, found ['a', 'b']"));
        assert!(errors.contains("Missing required keys: ['archives', 'repositories']"));
    }

    #[test]
    fn invalid_repository_types_are_sorted() {
        let mut errors = Errors::new();
        read_sections(
            &doc("repositories: {zeta: {}, alpha: {}, local: {}}\narchives: {}"),
            &mut errors,
        );
        assert!(errors.contains("Invalid repository types: {'alpha', 'zeta'}"));
    }

    #[test]
    fn repository_document_lists_each_missing_field() {
        let found = repository_document_errors(
            RepositoryType::Remote,
            "offsite",
            &serde_yaml::from_str("{name: offsite}").unwrap(),
        );
        assert_eq!(
            found,
            vec![
                "Repository \"offsite\" is missing attribute \"encryption\"",
                "Repository \"offsite\" is missing attribute \"hostname\"",
            ]
        );
    }

    #[test]
    fn prune_error_reports_only_offending_entries() {
        let prune = doc("[{keep_daily: 1}, {keep_lots: 2}, {keep_yearly: 3}]");
        assert_eq!(
            prune_error(&prune).as_deref(),
            Some("Invalid prune options: [{'keep_lots': 2}]")
        );
        assert_eq!(prune_error(&doc("[{keep_hourly: 1}]")), None);
        assert_eq!(prune_error(&Value::Null), None);
        assert_eq!(
            prune_error(&doc("{keep_daily: 1}")).as_deref(),
            Some("Invalid prune options: [{'keep_daily': 1}]")
        );
    }

    #[test]
    fn rclone_upload_path_needs_exactly_one_colon() {
        assert_eq!(rclone_upload_path_error(&doc("'b2:bucket/borg'")), None);
        assert_eq!(rclone_upload_path_error(&doc("''")), None);
        assert_eq!(rclone_upload_path_error(&Value::Null), None);
        assert_eq!(
            rclone_upload_path_error(&doc("'nocolon'")).as_deref(),
            Some("Invalid rclone_upload_path \"nocolon\". Path must contain a single colon")
        );
        assert_eq!(
            rclone_upload_path_error(&doc("'a:b:c'")).as_deref(),
            Some("Invalid rclone_upload_path \"a:b:c\". Path must contain a single colon")
        );
    }

    #[test]
    fn archives_need_paths_and_repositories() {
        let mut errors = Errors::new();
        check_archives(
            &[ArchiveDecl {
                name: "docs".to_string(),
                document: Mapping::new(),
            }],
            &mut errors,
        );
        assert!(errors.contains("Archive \"docs\" is missing attribute \"paths\""));
        assert!(errors.contains("Archive \"docs\" is missing attribute \"repositories\""));
    }
}
