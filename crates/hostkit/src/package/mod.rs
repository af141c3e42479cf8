//! Package manager backends.
//!
//! The [`PackageManager`] trait is the interface the package resource
//! converges through. One implementation exists per supported OS family.

pub mod apt;
pub mod pacman;
pub mod rpm;

use crate::command::CommandRunner;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Desired package state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PackageEnsure {
    /// Any installed version
    Present,
    /// Not installed
    Absent,
    /// The repository candidate version
    Latest,
    /// Exactly this version
    Version(String),
}

impl PackageEnsure {
    /// Whether the package should be installed at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl FromStr for PackageEnsure {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "present" | "installed" => Ok(Self::Present),
            "absent" | "purged" => Ok(Self::Absent),
            "latest" => Ok(Self::Latest),
            "" => Err("ensure cannot be empty".to_string()),
            v if v.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
                && !v.contains(char::is_whitespace) =>
            {
                Ok(Self::Version(v.to_string()))
            }
            other => Err(format!(
                "invalid ensure '{}': expected present, absent, latest or a version",
                other
            )),
        }
    }
}

impl TryFrom<String> for PackageEnsure {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PackageEnsure> for String {
    fn from(ensure: PackageEnsure) -> Self {
        ensure.to_string()
    }
}

impl fmt::Display for PackageEnsure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
            Self::Latest => f.write_str("latest"),
            Self::Version(v) => f.write_str(v),
        }
    }
}

/// Interface to the host's package database.
pub trait PackageManager: Send + Sync + fmt::Debug {
    /// Backend name, used for logging and lock keys.
    fn name(&self) -> &'static str;

    /// Installed version, `None` when not installed.
    fn installed_version(&self, package: &str) -> Result<Option<String>>;

    /// Version the repositories would install, `None` when unknown.
    fn candidate_version(&self, package: &str) -> Result<Option<String>>;

    /// Install (or upgrade/downgrade to) a package.
    fn install(&self, package: &str, version: Option<&str>) -> Result<()>;

    /// Remove a package.
    fn remove(&self, package: &str) -> Result<()>;
}

/// Select the package manager for an OS family.
pub fn for_os_family(
    family: &str,
    runner: Arc<dyn CommandRunner>,
) -> Result<Arc<dyn PackageManager>> {
    match family {
        "Debian" => Ok(Arc::new(apt::Apt::new(runner))),
        "RedHat" => Ok(Arc::new(rpm::Dnf::new(runner))),
        "Suse" => Ok(Arc::new(rpm::Zypper::new(runner))),
        "Archlinux" => Ok(Arc::new(pacman::Pacman::new(runner))),
        other => Err(Error::Unsupported(format!(
            "no package manager for OS family '{}'",
            other
        ))),
    }
}

/// Extract the value of a `Key : value` line from tool output.
pub(crate) fn field_value<'a>(output: &'a str, key: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim()).filter(|v| !v.is_empty())
    })
}
