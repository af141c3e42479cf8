//! Arch Linux backend using `pacman`.

use super::{PackageManager, field_value};
use crate::command::CommandRunner;
use crate::error::{Error, Result};
use std::sync::Arc;

/// pacman backend.
#[derive(Debug, Clone)]
pub struct Pacman {
    runner: Arc<dyn CommandRunner>,
}

impl Pacman {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageManager for Pacman {
    fn name(&self) -> &'static str {
        "pacman"
    }

    fn installed_version(&self, package: &str) -> Result<Option<String>> {
        let output = self.runner.run("pacman", &["-Q", package])?;
        if !output.success() {
            return Ok(None);
        }
        // "openssh 9.7p1-2"
        Ok(output
            .stdout
            .split_whitespace()
            .nth(1)
            .map(str::to_string))
    }

    fn candidate_version(&self, package: &str) -> Result<Option<String>> {
        let output = self.runner.run_checked("pacman", &["-Si", package], package)?;
        Ok(field_value(&output, "Version").map(str::to_string))
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<()> {
        if let Some(version) = version {
            let candidate = self.candidate_version(package)?;
            if candidate.as_deref() != Some(version) {
                return Err(Error::Unsupported(format!(
                    "pacman cannot install {} {} (repository has {})",
                    package,
                    version,
                    candidate.as_deref().unwrap_or("nothing")
                )));
            }
        }
        self.runner
            .run_checked("pacman", &["-S", "--noconfirm", package], package)?;
        Ok(())
    }

    fn remove(&self, package: &str) -> Result<()> {
        self.runner
            .run_checked("pacman", &["-R", "--noconfirm", package], package)?;
        Ok(())
    }
}
