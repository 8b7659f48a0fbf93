//! Schema types for repositories and archives.
//!
//! These records are decoded from documents that already passed structural
//! validation and reference resolution; they carry no behavior beyond derived,
//! read-only properties such as the storage URL.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Compression used by `borg create` unless an archive overrides it.
pub const DEFAULT_COMPRESSION: &str = "lz4";

/// Port assumed for remote repositories that do not declare one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Path used for remote repositories that do not declare one (the login directory).
pub const DEFAULT_REMOTE_PATH: &str = ".";

/// Every key accepted inside a `prune` sequence.
pub const PRUNE_KEYS: [&str; 5] = [
    "keep_hourly",
    "keep_daily",
    "keep_weekly",
    "keep_monthly",
    "keep_yearly",
];

/// Storage kind of a repository, taken from its namespace under `repositories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryType {
    /// Backed by a filesystem path.
    Local,
    /// Backed by an SSH-accessible host.
    Remote,
}

impl RepositoryType {
    /// Namespaces in the order they are read from a document.
    pub const ALL: [RepositoryType; 2] = [RepositoryType::Local, RepositoryType::Remote];

    /// Parse a repository namespace key.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }

    /// Attributes a repository document of this type must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Local => &["name", "encryption", "path"],
            Self::Remote => &["name", "encryption", "hostname"],
        }
    }
}

/// Retention counts per time granularity, passed through to `borg prune`.
///
/// An absent field means "no limit at that granularity", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOptions {
    pub keep_hourly: Option<u32>,
    pub keep_daily: Option<u32>,
    pub keep_weekly: Option<u32>,
    pub keep_monthly: Option<u32>,
    pub keep_yearly: Option<u32>,
}

impl PruneOptions {
    pub fn is_valid_key(key: &str) -> bool {
        PRUNE_KEYS.contains(&key)
    }

    /// True when no granularity is limited.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Set fields in canonical order (hourly to yearly).
    pub fn entries(&self) -> Vec<(&'static str, u32)> {
        [
            ("keep_hourly", self.keep_hourly),
            ("keep_daily", self.keep_daily),
            ("keep_weekly", self.keep_weekly),
            ("keep_monthly", self.keep_monthly),
            ("keep_yearly", self.keep_yearly),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }

    /// Render as `borg prune` flags, omitting unset fields.
    ///
    /// `keep_daily: 7` becomes `--keep-daily 7`.
    pub fn to_args(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .flat_map(|(key, value)| [format!("--{}", key.replace('_', "-")), value.to_string()])
            .collect()
    }

    /// Store `value` under `key`. Returns false for an unrecognized key.
    fn set(&mut self, key: &str, value: u32) -> bool {
        let slot = match key {
            "keep_hourly" => &mut self.keep_hourly,
            "keep_daily" => &mut self.keep_daily,
            "keep_weekly" => &mut self.keep_weekly,
            "keep_monthly" => &mut self.keep_monthly,
            "keep_yearly" => &mut self.keep_yearly,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

impl Serialize for PruneOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for (key, value) in entries {
            seq.serialize_element(&BTreeMap::from([(key, value)]))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PruneOptions {
    /// Folds `[{keep_daily: 7}, {keep_weekly: 3}]` into one record.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Option::<Vec<BTreeMap<String, u32>>>::deserialize(deserializer)?;
        let mut options = PruneOptions::default();
        for entry in entries.unwrap_or_default() {
            for (key, value) in entry {
                if !options.set(&key, value) {
                    return Err(de::Error::custom(format!("unknown prune option '{key}'")));
                }
            }
        }
        Ok(options)
    }
}

/// A named backup destination.
///
/// Shared attributes live on the struct; type-specific ones on [`RepositoryKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub encryption: String,
    pub prune: PruneOptions,
    pub compact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rclone_upload_path: Option<String>,
    #[serde(flatten)]
    pub kind: RepositoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositoryKind {
    Local {
        path: String,
    },
    Remote {
        hostname: String,
        username: Option<String>,
        port: u16,
        ssh_key: Option<String>,
        path: String,
    },
}

/// Attributes shared by both repository documents.
#[derive(Debug, Deserialize)]
struct CommonDocument {
    encryption: String,
    #[serde(default)]
    prune: PruneOptions,
    #[serde(default, deserialize_with = "null_as_default")]
    compact: bool,
    #[serde(default)]
    rclone_upload_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalDocument {
    path: String,
}

#[derive(Debug, Deserialize)]
struct RemoteDocument {
    hostname: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    ssh_key: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl Repository {
    /// Decode a merged repository document of the given type.
    ///
    /// `name` comes from the document's key, not its body. Unknown attributes
    /// are ignored.
    pub fn from_document(
        repo_type: RepositoryType,
        name: &str,
        document: &Mapping,
    ) -> Result<Self, serde_yaml::Error> {
        let value = Value::Mapping(document.clone());
        let common: CommonDocument = serde_yaml::from_value(value.clone())?;

        let kind = match repo_type {
            RepositoryType::Local => {
                let local: LocalDocument = serde_yaml::from_value(value)?;
                RepositoryKind::Local { path: local.path }
            }
            RepositoryType::Remote => {
                let remote: RemoteDocument = serde_yaml::from_value(value)?;
                RepositoryKind::Remote {
                    hostname: remote.hostname,
                    username: remote.username.filter(|u| !u.is_empty()),
                    port: remote.port.unwrap_or(DEFAULT_SSH_PORT),
                    ssh_key: remote.ssh_key.filter(|k| !k.is_empty()),
                    path: remote
                        .path
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string()),
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            encryption: common.encryption,
            prune: common.prune,
            compact: common.compact,
            rclone_upload_path: common.rclone_upload_path.filter(|p| !p.is_empty()),
            kind,
        })
    }

    /// Storage URL for `archive` inside this repository.
    ///
    /// The archive name is always the last path segment.
    pub fn url(&self, archive: &str) -> String {
        match &self.kind {
            RepositoryKind::Local { path } => {
                format!("{}/{}", path.trim_end_matches('/'), archive)
            }
            RepositoryKind::Remote {
                hostname,
                username,
                port,
                path,
                ..
            } => {
                let user = username
                    .as_deref()
                    .map(|u| format!("{u}@"))
                    .unwrap_or_default();
                format!(
                    "ssh://{user}{hostname}:{port}{}/{archive}",
                    anchor_remote_path(path)
                )
            }
        }
    }

    /// SSH command borg should use to reach a remote repository.
    ///
    /// borg splits this value into words, so the key path is shell-quoted.
    pub fn rsh(&self) -> Option<String> {
        match &self.kind {
            RepositoryKind::Local { .. } => None,
            RepositoryKind::Remote { ssh_key, .. } => {
                let mut cmd = "ssh -o VisualHostKey=no".to_string();
                if let Some(key) = ssh_key {
                    cmd.push_str(" -i ");
                    cmd.push_str(&shell_words::quote(key));
                }
                Some(cmd)
            }
        }
    }
}

/// Anchor a remote path for an `ssh://` URL.
///
/// Absolute paths are kept. Home-relative paths (`~/…`, `~user/…`) become
/// borg's `/~/…` form. Other relative paths become `/./…` so the server
/// resolves them against the login directory.
fn anchor_remote_path(path: &str) -> String {
    if path.starts_with('/') {
        return path.trim_end_matches('/').to_string();
    }
    if path.starts_with('~') {
        return format!("/{}", path.trim_end_matches('/'));
    }
    let relative = path.trim_start_matches("./").trim_end_matches('/');
    if relative.is_empty() || relative == "." {
        "/.".to_string()
    } else {
        format!("/./{relative}")
    }
}

/// A named set of paths to back up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    #[serde(skip_deserializing)]
    pub name: String,
    pub paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclude: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub one_file_system: bool,
    #[serde(default = "default_compression")]
    pub compression: String,
}

impl Archive {
    /// Decode an archive document. The `repositories` reference field is
    /// ignored here; it is consumed by reference resolution.
    pub fn from_document(name: &str, document: &Mapping) -> Result<Self, String> {
        let mut archive: Archive = serde_yaml::from_value(Value::Mapping(document.clone()))
            .map_err(|e| e.to_string())?;
        if archive.paths.is_empty() {
            return Err("paths must not be empty".to_string());
        }
        archive.name = name.to_string();
        Ok(archive)
    }
}

fn default_compression() -> String {
    DEFAULT_COMPRESSION.to_string()
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
