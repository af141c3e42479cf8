//! Debian family backend using `dpkg-query`, `apt-cache` and `apt-get`.

use super::{PackageManager, field_value};
use crate::command::CommandRunner;
use crate::error::Result;
use std::sync::Arc;

/// apt/dpkg backend.
#[derive(Debug, Clone)]
pub struct Apt {
    runner: Arc<dyn CommandRunner>,
}

impl Apt {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn apt_get(&self, args: &[&str], package: &str) -> Result<()> {
        let mut full = vec![
            "DEBIAN_FRONTEND=noninteractive",
            "apt-get",
            "-q",
            "-y",
            "-o",
            "DPkg::Options::=--force-confold",
        ];
        full.extend_from_slice(args);
        self.runner.run_checked("env", &full, package)?;
        Ok(())
    }
}

/// Parse `dpkg-query -W -f '${Status}|${Version}'` output.
fn parse_dpkg_status(output: &str) -> Option<String> {
    let (status, version) = output.trim().split_once('|')?;
    (status.ends_with(" installed") && !version.is_empty()).then(|| version.to_string())
}

impl PackageManager for Apt {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn installed_version(&self, package: &str) -> Result<Option<String>> {
        let output = self
            .runner
            .run("dpkg-query", &["-W", "-f=${Status}|${Version}", package])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_dpkg_status(&output.stdout))
    }

    fn candidate_version(&self, package: &str) -> Result<Option<String>> {
        let output = self.runner.run_checked("apt-cache", &["policy", package], package)?;
        Ok(field_value(&output, "Candidate")
            .filter(|v| *v != "(none)")
            .map(str::to_string))
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<()> {
        let spec = match version {
            Some(v) => format!("{}={}", package, v),
            None => package.to_string(),
        };
        self.apt_get(&["install", "--allow-downgrades", &spec], package)
    }

    fn remove(&self, package: &str) -> Result<()> {
        self.apt_get(&["remove", package], package)
    }
}
