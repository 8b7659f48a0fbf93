//! `borg-drone info` and `borg-drone list`.

use super::initialised;
use crate::context::DroneContext;
use crate::error::Result;
use crate::runner::{args, CommandRunner};

pub fn cmd_info(ctx: &DroneContext, archives: &[String], runner: &dyn CommandRunner) -> Result<()> {
    for target in initialised(ctx.targets(archives)?) {
        runner.run(&args(["borg", "info"]), &target.environment)?;
    }
    Ok(())
}

pub fn cmd_list(ctx: &DroneContext, archives: &[String], runner: &dyn CommandRunner) -> Result<()> {
    for target in initialised(ctx.targets(archives)?) {
        runner.run(&args(["borg", "list"]), &target.environment)?;
    }
    Ok(())
}
