//! Filesystem helpers for per-target state.

pub mod atomic;
pub mod secret;

pub use atomic::atomic_write;
pub use secret::ensure_password_file;
