//! External command runner for borg-drone.
//!
//! Every borg, ssh and rclone invocation goes through a [`CommandRunner`], so
//! commands can be exercised in tests without any of those tools installed.

use crate::config::Environment;
use crate::error::{DroneError, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

/// Runs a program with extra environment variables.
pub trait CommandRunner {
    /// Run `args[0]` with the remaining arguments and `env` added to the
    /// inherited environment.
    ///
    /// Returns the lines the program wrote to stdout. A non-zero exit is a
    /// [`DroneError::Process`].
    fn run(&self, args: &[String], env: &Environment) -> Result<Vec<String>>;
}

/// Spawns real processes, streaming their output into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[String], env: &Environment) -> Result<Vec<String>> {
        let command_line = command_line(args);
        let Some((program, rest)) = args.split_first() else {
            return Err(DroneError::UserError("empty command".to_string()));
        };

        tracing::info!("> {}", command_line);
        for (key, value) in env {
            tracing::info!("  ENV: {} = {}", key, value);
        }

        let mut child = Command::new(program)
            .args(rest)
            .envs(env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DroneError::io(format!("failed to execute {program}"), e))?;

        // borg reports progress and statistics on stderr.
        let stderr = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                    tracing::info!("{}", line);
                }
            })
        });

        let output = child
            .stdout
            .take()
            .map(|stdout| collect_lines(stdout, program))
            .unwrap_or_else(|| Ok(Vec::new()));

        // Reap the child and the stderr reader even when reading stdout failed.
        if output.is_err() {
            let _ = child.kill();
        }
        let status = child.wait();
        if let Some(handle) = stderr {
            let _ = handle.join();
        }
        let lines = output?;
        let status =
            status.map_err(|e| DroneError::io(format!("failed to wait for {program}"), e))?;

        if status.success() {
            Ok(lines)
        } else {
            Err(DroneError::Process {
                command: command_line,
                exit_code: status.code().unwrap_or(-1),
            })
        }
    }
}

fn collect_lines<R: Read>(reader: R, program: &str) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line =
            line.map_err(|e| DroneError::io(format!("failed to read output of {program}"), e))?;
        tracing::info!("{}", line);
        lines.push(line);
    }
    Ok(lines)
}

/// Quote `args` the way a shell would need them.
pub fn command_line(args: &[String]) -> String {
    shell_words::join(args)
}

/// Convenience for building argument vectors from string literals.
pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
