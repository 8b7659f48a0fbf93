//! Exit code constants for the borg-drone CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state, local filesystem failure)
//! - 2: Configuration error (unreadable file or failed validation)
//! - 3: External command failure (borg, rclone, ssh-keyscan)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid local state.
pub const USER_ERROR: i32 = 1;

/// The configuration file could not be loaded or did not validate.
pub const CONFIG_ERROR: i32 = 2;

/// An external program exited with a non-zero status.
pub const PROCESS_FAILURE: i32 = 3;
