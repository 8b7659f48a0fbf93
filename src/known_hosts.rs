//! Registering remote repository hosts in `~/.ssh/known_hosts`.
//!
//! borg connects over ssh non-interactively, so a remote host has to be known
//! before `borg init` runs against it.

use crate::config::types::DEFAULT_SSH_PORT;
use crate::config::Environment;
use crate::error::{DroneError, Result};
use crate::runner::{args, CommandRunner};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `~/.ssh/known_hosts` for the current user.
pub fn default_known_hosts() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        DroneError::UserError("could not determine the home directory".to_string())
    })?;
    Ok(home.join(".ssh").join("known_hosts"))
}

/// How ssh names a host in known_hosts: `host`, or `[host]:port` off the default port.
pub fn host_pattern(hostname: &str, port: u16) -> String {
    if port == DEFAULT_SSH_PORT {
        hostname.to_string()
    } else {
        format!("[{hostname}]:{port}")
    }
}

/// Make sure `hostname` has an entry in `known_hosts`, scanning its keys if not.
///
/// Returns whether keys were appended.
pub fn ensure_known_host(
    runner: &dyn CommandRunner,
    known_hosts: &Path,
    hostname: &str,
    port: u16,
) -> Result<bool> {
    prepare(known_hosts)?;
    let pattern = host_pattern(hostname, port);

    if has_plain_entry(known_hosts, &pattern)? || has_hashed_entry(runner, known_hosts, &pattern)? {
        tracing::debug!(host = %pattern, "host already known");
        return Ok(false);
    }

    let mut scan = args(["ssh-keyscan", "-H"]);
    if port != DEFAULT_SSH_PORT {
        scan.extend(args(["-p".to_string(), port.to_string()]));
    }
    scan.push(hostname.to_string());

    let keys: Vec<String> = runner
        .run(&scan, &Environment::new())?
        .into_iter()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .collect();
    if keys.is_empty() {
        tracing::warn!(host = %pattern, "ssh-keyscan returned no keys");
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(known_hosts)
        .map_err(|e| io_error("failed to open", known_hosts, e))?;
    writeln!(file, "{}", keys.join("\n")).map_err(|e| io_error("failed to write", known_hosts, e))?;
    tracing::info!(host = %pattern, keys = keys.len(), "added host keys to known_hosts");
    Ok(true)
}

/// Create `~/.ssh` (0700) and an empty known_hosts (0600) when missing.
fn prepare(known_hosts: &Path) -> Result<()> {
    if let Some(dir) = known_hosts.parent()
        && !dir.exists()
    {
        fs::create_dir_all(dir).map_err(|e| io_error("failed to create", dir, e))?;
        set_mode(dir, 0o700)?;
    }
    if !known_hosts.exists() {
        fs::write(known_hosts, b"").map_err(|e| io_error("failed to create", known_hosts, e))?;
        set_mode(known_hosts, 0o600)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| io_error("failed to set permissions on", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn has_plain_entry(known_hosts: &Path, pattern: &str) -> Result<bool> {
    let content =
        fs::read_to_string(known_hosts).map_err(|e| io_error("failed to read", known_hosts, e))?;
    Ok(content.lines().any(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|hosts| hosts.split(',').any(|h| h == pattern))
    }))
}

/// Hashed entries (`|1|...`) can only be matched by ssh-keygen, which exits
/// with status 1 when the host is absent.
fn has_hashed_entry(runner: &dyn CommandRunner, known_hosts: &Path, pattern: &str) -> Result<bool> {
    let lookup = args([
        "ssh-keygen".to_string(),
        "-F".to_string(),
        pattern.to_string(),
        "-f".to_string(),
        known_hosts.display().to_string(),
    ]);
    match runner.run(&lookup, &Environment::new()) {
        Ok(lines) => Ok(lines.iter().any(|l| !l.starts_with('#') && !l.trim().is_empty())),
        Err(DroneError::Process { exit_code: 1, .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

fn io_error(action: &str, path: &Path, source: std::io::Error) -> DroneError {
    DroneError::io(format!("{action} '{}'", path.display()), source)
}
