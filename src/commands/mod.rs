//! Command implementations for borg-drone.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every external program is started through the
//! [`CommandRunner`] handed in by `main`.

mod create;
mod init;
mod inspect;
mod keys;
mod targets;


use crate::cli::Command;
use crate::config::Target;
use crate::context::DroneContext;
use crate::error::Result;
use crate::runner::CommandRunner;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, ctx: &DroneContext, runner: &dyn CommandRunner) -> Result<()> {
    match command {
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Targets(args) => targets::cmd_targets(ctx, &args.selection.archives, args.format),
        Command::Init(args) => init::cmd_init(ctx, &args.archives, runner),
        Command::Info(args) => inspect::cmd_info(ctx, &args.archives, runner),
        Command::List(args) => inspect::cmd_list(ctx, &args.archives, runner),
        Command::Create(args) => create::cmd_create(ctx, &args.archives, runner),
        Command::KeyExport(args) => keys::cmd_key_export(ctx, &args.archives, runner),
        Command::KeyCleanup(args) => keys::cmd_key_cleanup(ctx, &args.archives),
    }
}

/// Targets that `borg init` has completed for; the others are skipped with a
/// warning.
fn initialised(targets: Vec<Target>) -> impl Iterator<Item = Target> {
    targets.into_iter().filter(|target| {
        let ready = target.initialised();
        if !ready {
            tracing::warn!(
                target_id = %target.id(),
                "target is not initialised, run `borg-drone init` first"
            );
        }
        ready
    })
}
