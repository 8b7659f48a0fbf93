//! Targets: resolved (archive, repository) pairs with their runtime state.
//!
//! A target's local state lives in `{config_dir}/{archive}_{repo}/`:
//!
//! - `passwd`: the repository passphrase, read by borg through `BORG_PASSCOMMAND`
//! - `.initialised`: empty marker written once `borg init` succeeded
//! - `keyfile.txt` / `keyfile.paper`: exported keys, removed by `key-cleanup`
//!
//! Building a target never touches the filesystem.

use super::resolve::ResolvedArchive;
use super::types::{Archive, Repository};
use super::validate::{repository_document_errors, Errors};
use crate::error::{DroneError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const PASSWORD_FILE: &str = "passwd";
pub const KEYFILE: &str = "keyfile.txt";
pub const PAPER_KEYFILE: &str = "keyfile.paper";
pub const INITIALISED_MARKER: &str = ".initialised";

/// Environment passed to every borg invocation for a target.
pub type Environment = BTreeMap<String, String>;

/// One unit of backup work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub archive: Archive,
    pub repo: Repository,
    /// Per-target state directory.
    pub config_path: PathBuf,
    /// Value of `BORG_REPO`.
    pub url: String,
    pub environment: Environment,
}

impl Target {
    pub fn new(archive: Archive, repo: Repository, config_dir: &Path) -> Self {
        let config_path = config_dir.join(state_dir_name(&archive.name, &repo.name));
        let url = repo.url(&archive.name);
        let password_file = config_path.join(PASSWORD_FILE);

        // borg splits BORG_PASSCOMMAND into words before running it.
        let mut environment = Environment::new();
        environment.insert(
            "BORG_PASSCOMMAND".to_string(),
            format!("cat {}", shell_words::quote(&password_file.to_string_lossy())),
        );
        environment.insert(
            "BORG_RELOCATED_REPO_ACCESS_IS_OK".to_string(),
            "yes".to_string(),
        );
        environment.insert("BORG_REPO".to_string(), url.clone());
        if let Some(rsh) = repo.rsh() {
            environment.insert("BORG_RSH".to_string(), rsh);
        }

        Self {
            archive,
            repo,
            config_path,
            url,
            environment,
        }
    }

    /// `{archive}_{repo}`, also the state directory name.
    pub fn id(&self) -> String {
        state_dir_name(&self.archive.name, &self.repo.name)
    }

    pub fn password_file(&self) -> PathBuf {
        self.config_path.join(PASSWORD_FILE)
    }

    pub fn keyfile(&self) -> PathBuf {
        self.config_path.join(KEYFILE)
    }

    pub fn paper_keyfile(&self) -> PathBuf {
        self.config_path.join(PAPER_KEYFILE)
    }

    fn marker(&self) -> PathBuf {
        self.config_path.join(INITIALISED_MARKER)
    }

    /// Whether `borg init` has completed for this target.
    pub fn initialised(&self) -> bool {
        self.marker().exists()
    }

    /// Create the state directory if needed and return it.
    pub fn ensure_config_path(&self) -> Result<&Path> {
        fs::create_dir_all(&self.config_path).map_err(|e| {
            DroneError::io(
                format!(
                    "failed to create state directory '{}'",
                    self.config_path.display()
                ),
                e,
            )
        })?;
        Ok(&self.config_path)
    }

    /// Record that the repository was created.
    pub fn mark_initialised(&self) -> Result<()> {
        self.ensure_config_path()?;
        crate::fs::atomic_write(self.marker(), b"")
    }
}

fn state_dir_name(archive: &str, repo: &str) -> String {
    format!("{archive}_{repo}")
}

/// Build one target per (archive, resolved repository) pair.
///
/// Documents that fail a structural rule were already reported and are
/// skipped; documents that fail typed decoding are reported here.
pub fn build_targets(
    archives: &[ResolvedArchive],
    config_dir: &Path,
    errors: &mut Errors,
) -> Vec<Target> {
    let mut targets = Vec::new();

    for resolved in archives {
        if !resolved.document.contains_key("paths") {
            continue;
        }
        let archive = match Archive::from_document(&resolved.name, &resolved.document) {
            Ok(archive) => archive,
            Err(e) => {
                errors.insert(format!("Archive \"{}\" is invalid: {}", resolved.name, e));
                continue;
            }
        };

        for repo_doc in &resolved.repositories {
            let problems =
                repository_document_errors(repo_doc.repo_type, &repo_doc.name, &repo_doc.document);
            if !problems.is_empty() {
                errors.extend(problems);
                continue;
            }
            match Repository::from_document(repo_doc.repo_type, &repo_doc.name, &repo_doc.document)
            {
                Ok(repo) => targets.push(Target::new(archive.clone(), repo, config_dir)),
                Err(e) => {
                    errors.insert(format!(
                        "Repository \"{}\" is invalid: {}",
                        repo_doc.name, e
                    ));
                }
            }
        }
    }

    check_state_dirs(&targets, errors);
    targets
}

/// `{archive}_{repo}` can collide (`a_b` + `c` vs `a` + `b_c`).
fn check_state_dirs(targets: &[Target], errors: &mut Errors) {
    let mut owners: HashMap<&Path, &Target> = HashMap::new();
    for target in targets {
        if let Some(other) = owners.insert(target.config_path.as_path(), target) {
            errors.insert(format!(
                "Targets \"{}/{}\" and \"{}/{}\" share state directory \"{}\"",
                other.archive.name,
                other.repo.name,
                target.archive.name,
                target.repo.name,
                target.id()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve::ResolvedRepository;
    use crate::config::types::RepositoryType;
    use serde_yaml::Mapping;
    use tempfile::TempDir;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn resolved(name: &str, archive: &str, repos: Vec<ResolvedRepository>) -> ResolvedArchive {
        ResolvedArchive {
            name: name.to_string(),
            document: mapping(archive),
            repositories: repos,
        }
    }

    fn repo_doc(repo_type: RepositoryType, name: &str, yaml: &str) -> ResolvedRepository {
        let mut document = mapping(yaml);
        document.insert(serde_yaml::Value::from("name"), serde_yaml::Value::from(name));
        ResolvedRepository {
            repo_type,
            name: name.to_string(),
            document,
        }
    }

    #[test]
    fn local_target_environment() {
        let mut errors = Errors::new();
        let targets = build_targets(
            &[resolved(
                "docs",
                "{paths: [~/Documents]}",
                vec![repo_doc(
                    RepositoryType::Local,
                    "usb",
                    "{path: /media/usb, encryption: keyfile-blake2}",
                )],
            )],
            Path::new("/cfg"),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        let target = &targets[0];

        assert_eq!(target.id(), "docs_usb");
        assert_eq!(target.config_path, PathBuf::from("/cfg/docs_usb"));
        assert_eq!(target.password_file(), PathBuf::from("/cfg/docs_usb/passwd"));
        assert_eq!(target.keyfile(), PathBuf::from("/cfg/docs_usb/keyfile.txt"));
        assert_eq!(
            target.paper_keyfile(),
            PathBuf::from("/cfg/docs_usb/keyfile.paper")
        );
        assert_eq!(target.url, "/media/usb/docs");
        assert_eq!(
            target.environment,
            Environment::from([
                (
                    "BORG_PASSCOMMAND".to_string(),
                    "cat /cfg/docs_usb/passwd".to_string()
                ),
                (
                    "BORG_RELOCATED_REPO_ACCESS_IS_OK".to_string(),
                    "yes".to_string()
                ),
                ("BORG_REPO".to_string(), "/media/usb/docs".to_string()),
            ])
        );
    }

    #[test]
    fn remote_target_sets_rsh() {
        let mut errors = Errors::new();
        let targets = build_targets(
            &[resolved(
                "docs",
                "{paths: [/srv]}",
                vec![repo_doc(
                    RepositoryType::Remote,
                    "offsite",
                    "{hostname: offsite.example.com, username: backup, ssh_key: /k, encryption: repokey}",
                )],
            )],
            Path::new("/cfg"),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        let env = &targets[0].environment;
        assert_eq!(
            env.get("BORG_REPO").map(String::as_str),
            Some("ssh://backup@offsite.example.com:22/./docs")
        );
        assert_eq!(
            env.get("BORG_RSH").map(String::as_str),
            Some("ssh -o VisualHostKey=no -i /k")
        );
    }

    #[test]
    fn environment_commands_survive_word_splitting() {
        let mut errors = Errors::new();
        let targets = build_targets(
            &[resolved(
                "docs",
                "{paths: [/srv]}",
                vec![repo_doc(
                    RepositoryType::Remote,
                    "r",
                    "{hostname: h, ssh_key: '/home/a b/key', encryption: none}",
                )],
            )],
            Path::new("/home/a b/.config/borg-drone"),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        let env = &targets[0].environment;

        let passcommand = shell_words::split(&env["BORG_PASSCOMMAND"]).unwrap();
        assert_eq!(
            passcommand,
            vec!["cat", "/home/a b/.config/borg-drone/docs_r/passwd"]
        );

        let rsh = shell_words::split(&env["BORG_RSH"]).unwrap();
        assert_eq!(
            rsh,
            vec!["ssh", "-o", "VisualHostKey=no", "-i", "/home/a b/key"]
        );
    }

    #[test]
    fn typed_decode_failures_are_collected() {
        let mut errors = Errors::new();
        let targets = build_targets(
            &[
                resolved(
                    "a",
                    "{paths: [/a]}",
                    vec![repo_doc(
                        RepositoryType::Remote,
                        "r",
                        "{hostname: h, port: nope, encryption: x}",
                    )],
                ),
                resolved("b", "{paths: 5}", vec![]),
            ],
            Path::new("/cfg"),
            &mut errors,
        );
        assert!(targets.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("Repository \"r\" is invalid: ")));
        assert!(errors.iter().any(|e| e.starts_with("Archive \"b\" is invalid: ")));
    }

    #[test]
    fn state_dir_collisions_are_reported() {
        let mut errors = Errors::new();
        build_targets(
            &[
                resolved(
                    "a_b",
                    "{paths: [/x]}",
                    vec![repo_doc(RepositoryType::Local, "c", "{path: /c, encryption: x}")],
                ),
                resolved(
                    "a",
                    "{paths: [/y]}",
                    vec![repo_doc(RepositoryType::Local, "b_c", "{path: /bc, encryption: x}")],
                ),
            ],
            Path::new("/cfg"),
            &mut errors,
        );
        assert!(errors.contains("Targets \"a_b/c\" and \"a/b_c\" share state directory \"a_b_c\""));
    }

    #[test]
    fn initialised_follows_marker_file() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::from_document(
            RepositoryType::Local,
            "usb",
            &mapping("{path: /usb, encryption: none}"),
        )
        .unwrap();
        let archive = Archive::from_document("docs", &mapping("{paths: [/d]}")).unwrap();
        let target = Target::new(archive, repo, temp.path());

        assert!(!target.initialised());
        assert!(!target.config_path.exists());

        target.mark_initialised().unwrap();
        assert!(target.initialised());
        assert!(target.config_path.is_dir());
    }
}
