//! Running external tools.
//!
//! Every backend goes through a [`CommandRunner`] so that argument lists can
//! be checked in tests without touching the host.

use crate::error::{Error, Result};
use std::fmt;
use std::process::{Command, Stdio};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can run a program and capture its output.
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run a program to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; see [`CommandRunner::run_checked`].
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a program and fail unless it exits with status 0.
    ///
    /// `name` is the object being operated on, used to categorize failures.
    fn run_checked(&self, program: &str, args: &[&str], name: &str) -> Result<String> {
        let output = self.run(program, args)?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(Error::from_command_output(
                program,
                output.code,
                &output.stderr,
                name,
            ))
        }
    }
}

/// Runs real processes on the host.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    env: Vec<(String, String)>,
}

impl SystemRunner {
    /// Create a runner with the inherited environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every spawned process.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("exec: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
