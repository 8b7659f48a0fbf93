//! `borg-drone key-export` and `borg-drone key-cleanup`.
//!
//! Exported keys land next to the password file so they can be copied
//! somewhere safe, then removed again with `key-cleanup`.

use super::initialised;
use crate::context::DroneContext;
use crate::error::{DroneError, Result};
use crate::runner::{args, CommandRunner};
use std::fs;
use std::path::Path;

pub fn cmd_key_export(
    ctx: &DroneContext,
    archives: &[String],
    runner: &dyn CommandRunner,
) -> Result<()> {
    for target in initialised(ctx.targets(archives)?) {
        let keyfile = target.keyfile();
        let paper = target.paper_keyfile();
        runner.run(
            &args([
                "borg".to_string(),
                "key".to_string(),
                "export".to_string(),
                "::".to_string(),
                keyfile.display().to_string(),
            ]),
            &target.environment,
        )?;
        runner.run(
            &args([
                "borg".to_string(),
                "key".to_string(),
                "export".to_string(),
                "--paper".to_string(),
                "::".to_string(),
                paper.display().to_string(),
            ]),
            &target.environment,
        )?;
        tracing::info!(target_id = %target.id(), keyfile = %keyfile.display(), "exported keys");
    }
    Ok(())
}

pub fn cmd_key_cleanup(ctx: &DroneContext, archives: &[String]) -> Result<()> {
    for target in ctx.targets(archives)? {
        remove_if_present(&target.keyfile())?;
        remove_if_present(&target.paper_keyfile())?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed exported key");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DroneError::io(
            format!("failed to remove '{}'", path.display()),
            e,
        )),
    }
}
