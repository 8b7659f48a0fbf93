//! Implementation of the `borg-drone targets` command.

use crate::cli::OutputFormat;
use crate::config::{render_list, Target};
use crate::context::DroneContext;
use crate::error::{DroneError, Result};
use std::fmt::Write;

pub fn cmd_targets(ctx: &DroneContext, archives: &[String], format: OutputFormat) -> Result<()> {
    let targets = ctx.targets(archives)?;
    print!("{}", render_targets(&targets, format)?);
    Ok(())
}

/// Render targets in the requested format.
///
/// Text output groups targets by archive:
///
/// ```text
/// [archive1]
///     paths   = ~/src, ~/bin
///     exclude = ['**/venv']
///     repos   = usb (/path/to/usb/archive1), offsite (ssh://...)
/// ```
pub fn render_targets(targets: &[Target], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(targets)),
        OutputFormat::Json => serde_json::to_string_pretty(targets)
            .map(|json| json + "\n")
            .map_err(|e| DroneError::UserError(format!("failed to render targets: {e}"))),
        OutputFormat::Yaml => serde_yaml::to_string(targets)
            .map_err(|e| DroneError::UserError(format!("failed to render targets: {e}"))),
    }
}

fn render_text(targets: &[Target]) -> String {
    let mut groups: Vec<(&str, Vec<&Target>)> = Vec::new();
    for target in targets {
        match groups.iter_mut().find(|(name, _)| *name == target.archive.name) {
            Some((_, members)) => members.push(target),
            None => groups.push((target.archive.name.as_str(), vec![target])),
        }
    }

    let mut out = String::new();
    for (name, members) in groups {
        let archive = &members[0].archive;
        let repos: Vec<String> = members
            .iter()
            .map(|t| format!("{} ({})", t.repo.name, t.url))
            .collect();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "[{name}]");
        let _ = writeln!(out, "\tpaths   = {}", archive.paths.join(", "));
        let _ = writeln!(out, "\texclude = {}", render_list(archive.exclude.as_slice()));
        let _ = writeln!(out, "\trepos   = {}", repos.join(", "));
    }
    out
}
