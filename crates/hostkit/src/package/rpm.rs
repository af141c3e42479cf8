//! RPM based backends: `dnf` for the RedHat family, `zypper` for Suse.
//!
//! Both read the installed version from the rpm database.

use super::{PackageManager, field_value};
use crate::command::CommandRunner;
use crate::error::Result;
use std::sync::Arc;

fn rpm_installed_version(runner: &dyn CommandRunner, package: &str) -> Result<Option<String>> {
    let output = runner.run("rpm", &["-q", "--qf", "%{VERSION}-%{RELEASE}", package])?;
    if !output.success() {
        return Ok(None);
    }
    let version = output.stdout.trim();
    Ok((!version.is_empty()).then(|| version.to_string()))
}

/// dnf backend.
#[derive(Debug, Clone)]
pub struct Dnf {
    runner: Arc<dyn CommandRunner>,
}

impl Dnf {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageManager for Dnf {
    fn name(&self) -> &'static str {
        "dnf"
    }

    fn installed_version(&self, package: &str) -> Result<Option<String>> {
        rpm_installed_version(self.runner.as_ref(), package)
    }

    fn candidate_version(&self, package: &str) -> Result<Option<String>> {
        let output = self.runner.run_checked(
            "dnf",
            &[
                "-q",
                "repoquery",
                "--latest-limit",
                "1",
                "--qf",
                "%{version}-%{release}",
                package,
            ],
            package,
        )?;
        Ok(output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<()> {
        let spec = match version {
            Some(v) => format!("{}-{}", package, v),
            None => package.to_string(),
        };
        let verb = if self.installed_version(package)?.is_some() {
            if version.is_some() { "distro-sync" } else { "upgrade" }
        } else {
            "install"
        };
        self.runner.run_checked("dnf", &["-y", "-q", verb, &spec], package)?;
        Ok(())
    }

    fn remove(&self, package: &str) -> Result<()> {
        self.runner
            .run_checked("dnf", &["-y", "-q", "remove", package], package)?;
        Ok(())
    }
}

/// zypper backend.
#[derive(Debug, Clone)]
pub struct Zypper {
    runner: Arc<dyn CommandRunner>,
}

impl Zypper {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageManager for Zypper {
    fn name(&self) -> &'static str {
        "zypper"
    }

    fn installed_version(&self, package: &str) -> Result<Option<String>> {
        rpm_installed_version(self.runner.as_ref(), package)
    }

    fn candidate_version(&self, package: &str) -> Result<Option<String>> {
        let output = self.runner.run_checked(
            "zypper",
            &["--non-interactive", "--quiet", "info", package],
            package,
        )?;
        Ok(field_value(&output, "Version").map(str::to_string))
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<()> {
        let spec = match version {
            Some(v) => format!("{}={}", package, v),
            None => package.to_string(),
        };
        self.runner.run_checked(
            "zypper",
            &["--non-interactive", "install", "--oldpackage", &spec],
            package,
        )?;
        Ok(())
    }

    fn remove(&self, package: &str) -> Result<()> {
        self.runner
            .run_checked("zypper", &["--non-interactive", "remove", package], package)?;
        Ok(())
    }
}
