//! Repository passphrases.

use super::atomic::atomic_write_private;
use crate::error::Result;
use rand::Rng;
use std::path::Path;

const PASSWORD_BYTES: usize = 32;

/// 32 random bytes as 64 lowercase hex characters.
pub fn generate_password() -> String {
    let mut bytes = [0u8; PASSWORD_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Write a fresh password to `path` unless one is already there.
///
/// Returns whether a new password was written. An existing file is never
/// replaced: the repository is encrypted with whatever it holds.
pub fn ensure_password_file(path: &Path) -> Result<bool> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "password file exists");
        return Ok(false);
    }
    atomic_write_private(path, generate_password().as_bytes())?;
    tracing::info!(path = %path.display(), "generated password file");
    Ok(true)
}
