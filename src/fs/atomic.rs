//! Atomic file writes.
//!
//! Content is written to `.{filename}.tmp` next to the target, synced, then
//! renamed over the target. A crash leaves either the old file or the new one,
//! plus possibly the temporary file.

use crate::error::{DroneError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    write_with_mode(path.as_ref(), content, None)
}

/// Like [`atomic_write`], but the file is created with mode 0600 on unix.
pub fn atomic_write_private<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    write_with_mode(path.as_ref(), content, Some(0o600))
}

fn write_with_mode(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            DroneError::io(
                format!("failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let temp_path = temp_path(path)?;
    write_and_sync(&temp_path, content, mode)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        DroneError::io(format!("failed to replace '{}'", path.display()), e)
    })?;

    #[cfg(unix)]
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn temp_path(target: &Path) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            DroneError::UserError(format!("invalid file path '{}'", target.display()))
        })?;
    let parent = target.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!(".{filename}.tmp")))
}

fn write_and_sync(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    // A leftover temp file would keep its old permissions.
    let _ = fs::remove_file(path);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).map_err(|e| {
        DroneError::io(
            format!("failed to create temporary file '{}'", path.display()),
            e,
        )
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            DroneError::io(format!("failed to write '{}'", path.display()), e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("marker");

        atomic_write(&file_path, b"hello").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "hello");
        assert!(!temp_dir.path().join(".marker.tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("marker");
        fs::write(&file_path, "old").unwrap();

        atomic_write(&file_path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("docs_usb").join("passwd");

        atomic_write_private(&file_path, b"secret").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "secret");
    }

    #[cfg(unix)]
    #[test]
    fn test_private_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("passwd");

        atomic_write_private(&file_path, b"secret").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path(Path::new("/cfg/docs_usb/passwd")).unwrap();
        assert_eq!(temp, PathBuf::from("/cfg/docs_usb/.passwd.tmp"));
    }
}
