//! Implementation of the `borg-drone init` command.
//!
//! Prepares each target's state directory and runs `borg init` once. Running
//! it again is safe: existing passwords are kept and initialised targets are
//! left alone.

use crate::config::{RepositoryKind, Target};
use crate::context::DroneContext;
use crate::error::Result;
use crate::fs::ensure_password_file;
use crate::known_hosts::ensure_known_host;
use crate::runner::{args, CommandRunner};
use std::path::Path;

pub fn cmd_init(ctx: &DroneContext, archives: &[String], runner: &dyn CommandRunner) -> Result<()> {
    for target in ctx.targets(archives)? {
        init_target(&target, &ctx.known_hosts, runner)?;
    }
    Ok(())
}

pub(super) fn init_target(
    target: &Target,
    known_hosts: &Path,
    runner: &dyn CommandRunner,
) -> Result<()> {
    tracing::info!(target_id = %target.id(), "initialising");
    target.ensure_config_path()?;
    ensure_password_file(&target.password_file())?;

    if let RepositoryKind::Remote { hostname, port, .. } = &target.repo.kind {
        ensure_known_host(runner, known_hosts, hostname, *port)?;
    }

    if target.initialised() {
        tracing::info!(target_id = %target.id(), "already initialised");
        return Ok(());
    }

    runner.run(
        &args([
            "borg",
            "init",
            "--encryption",
            target.repo.encryption.as_str(),
            "--make-parent-dirs",
        ]),
        &target.environment,
    )?;
    target.mark_initialised()
}
