use crate::config::Environment;
use crate::error::{DroneError, Result};
use crate::runner::CommandRunner;
use serde_yaml::Value;
use std::cell::RefCell;
use std::path::Path;

/// Local `usb` and remote `offsite` repositories shared by two archives, the
/// second of which overrides `offsite`.
pub(crate) const SAMPLE_CONFIG: &str = r#"
repositories:
  local:
    usb:
      path: /path/to/usb
      encryption: keyfile-blake2
      prune:
        - keep_daily: 7
        - keep_weekly: 3
        - keep_monthly: 6
        - keep_yearly: 2
  remote:
    offsite:
      hostname: offsite.example.com
      username: backup
      port: 22
      ssh_key: ~/.ssh/borg
      encryption: repokey-blake2
      prune:
        - keep_daily: 7
        - keep_weekly: 3
        - keep_monthly: 6
        - keep_yearly: 2

archives:
  archive1:
    repositories: [usb, offsite]
    paths:
      - ~/.ssh
      - ~/.gnupg
      - ~/src
      - ~/bin
      - ~/Desktop
      - ~/Documents
      - ~/Pictures
    exclude:
      - "**/venv"
      - "**/.direnv"
      - "**/node_modules"
    one_file_system: true
  archive2:
    repositories:
      usb:
      offsite:
        encryption: encryption_override
        prune:
          - keep_daily: 1
          - keep_monthly: 2
    paths:
      - /data
"#;

pub(crate) fn sample_document() -> Value {
    serde_yaml::from_str(SAMPLE_CONFIG).unwrap()
}

/// Write `yaml` to `dir/config.yml`.
pub(crate) fn write_config(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("config.yml");
    std::fs::write(&path, yaml).unwrap();
    path
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub args: Vec<String>,
    pub env: Environment,
}

impl Call {
    pub(crate) fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

type Responder = Box<dyn Fn(&[String]) -> Result<Vec<String>>>;

/// Records every command instead of running it.
///
/// By default each command succeeds with no output; `respond_with` scripts
/// replies, and `fail_on` makes commands starting with a prefix fail.
pub(crate) struct RecordingRunner {
    calls: RefCell<Vec<Call>>,
    responder: Responder,
}

impl RecordingRunner {
    pub(crate) fn new() -> Self {
        Self::respond_with(|_| Ok(Vec::new()))
    }

    pub(crate) fn respond_with<F>(responder: F) -> Self
    where
        F: Fn(&[String]) -> Result<Vec<String>> + 'static,
    {
        Self {
            calls: RefCell::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub(crate) fn fail_on(prefix: &'static str, exit_code: i32) -> Self {
        Self::respond_with(move |args| {
            let line = args.join(" ");
            if line.starts_with(prefix) {
                Err(DroneError::Process {
                    command: line,
                    exit_code,
                })
            } else {
                Ok(Vec::new())
            }
        })
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::command_line).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, args: &[String], env: &Environment) -> Result<Vec<String>> {
        self.calls.borrow_mut().push(Call {
            args: args.to_vec(),
            env: env.clone(),
        });
        (self.responder)(args)
    }
}
