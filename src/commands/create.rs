//! Implementation of the `borg-drone create` command.
//!
//! For each initialised target:
//! 1. `borg create` a new archive named after the current time
//! 2. `borg prune` when the repository has prune options
//! 3. `borg compact` when `compact` is set
//! 4. `rclone sync` the repository when it is local and has an upload path

use super::initialised;
use crate::config::{RepositoryKind, Target};
use crate::context::DroneContext;
use crate::error::Result;
use crate::runner::{args, CommandRunner};

/// Archive name expanded by borg itself.
const ARCHIVE_NAME: &str = "::{now}";

pub fn cmd_create(ctx: &DroneContext, archives: &[String], runner: &dyn CommandRunner) -> Result<()> {
    for target in initialised(ctx.targets(archives)?) {
        create_target(&target, runner)?;
    }
    Ok(())
}

pub(super) fn create_target(target: &Target, runner: &dyn CommandRunner) -> Result<()> {
    tracing::info!(target_id = %target.id(), "creating backup");
    runner.run(&create_args(target), &target.environment)?;

    let prune = &target.repo.prune;
    if !prune.is_empty() {
        let mut prune_args = args(["borg", "prune", "--list"]);
        prune_args.extend(prune.to_args());
        runner.run(&prune_args, &target.environment)?;
    }

    if target.repo.compact {
        runner.run(&args(["borg", "compact"]), &target.environment)?;
    }

    if let Some(sync) = rclone_args(target) {
        runner.run(&sync, &target.environment)?;
    }
    Ok(())
}

fn create_args(target: &Target) -> Vec<String> {
    let archive = &target.archive;
    let mut create = args([
        "borg",
        "create",
        "--stats",
        "--compression",
        archive.compression.as_str(),
    ]);
    if archive.one_file_system {
        create.push("--one-file-system".to_string());
    }
    for pattern in &archive.exclude {
        create.push("--exclude".to_string());
        create.push(pattern.clone());
    }
    create.push(ARCHIVE_NAME.to_string());
    create.extend(archive.paths.iter().map(|p| expand_tilde(p)));
    create
}

/// `rclone sync {repo path}/{archive} {upload path}/{archive}`, for local
/// repositories only.
fn rclone_args(target: &Target) -> Option<Vec<String>> {
    let RepositoryKind::Local { .. } = target.repo.kind else {
        return None;
    };
    let upload = target
        .repo
        .rclone_upload_path
        .as_deref()
        .filter(|p| !p.is_empty())?;
    Some(args([
        "rclone".to_string(),
        "sync".to_string(),
        target.url.clone(),
        format!("{}/{}", upload.trim_end_matches('/'), target.archive.name),
    ]))
}

/// Expand a leading `~` or `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    let home = || dirs::home_dir().map(|h| h.to_string_lossy().to_string());
    if path == "~"
        && let Some(home) = home()
    {
        return home;
    }
    if let Some(suffix) = path.strip_prefix("~/")
        && let Some(home) = home()
    {
        return format!("{}/{}", home.trim_end_matches('/'), suffix);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_only_touches_leading_home() {
        assert_eq!(expand_tilde("/data"), "/data");
        assert_eq!(expand_tilde("~user/x"), "~user/x");
        assert_eq!(expand_tilde("a/~/b"), "a/~/b");
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy().to_string();
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(
                expand_tilde("~/src"),
                format!("{}/src", home.trim_end_matches('/'))
            );
        }
    }
}
