//! Host facts: names and OS family.
//!
//! Facts feed the parameter layers (`hostkey_name` defaults to the FQDN) and
//! the platform lookup when no `osfamily` parameter is given.

use anyhow::{Context, Result};
use hostkit::CommandRunner;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Facts gathered from the running host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facts {
    /// Short host name
    pub hostname: String,
    /// Fully qualified name, falls back to the short name
    pub fqdn: String,
    /// `ID` from os-release
    pub os_id: Option<String>,
    /// `ID_LIKE` from os-release, split on whitespace
    pub os_id_like: Vec<String>,
    /// `PRETTY_NAME` from os-release
    pub os_name: Option<String>,
    /// Family derived from `ID` / `ID_LIKE`
    pub osfamily: Option<String>,
}

impl Facts {
    /// Gather facts from the system
    pub fn gather(runner: &dyn CommandRunner) -> Result<Self> {
        let hostname = read_hostname()?;
        let fqdn = match runner.run("hostname", &["-f"]) {
            Ok(output) if output.success() && !output.stdout.trim().is_empty() => {
                output.stdout.trim().to_string()
            }
            Ok(output) => {
                log::debug!("hostname -f failed: {}", output.stderr.trim());
                hostname.clone()
            }
            Err(e) => {
                log::debug!("hostname -f unavailable: {}", e);
                hostname.clone()
            }
        };

        let release = OS_RELEASE_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(|p| {
                fs::read_to_string(p).with_context(|| format!("Could not read {}", p.display()))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self::from_parts(hostname, fqdn, &release))
    }

    /// Build facts from already collected values
    pub fn from_parts(hostname: String, fqdn: String, os_release: &str) -> Self {
        let fields = parse_os_release(os_release);
        let os_id = fields.get("ID").cloned();
        let os_id_like: Vec<String> = fields
            .get("ID_LIKE")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let osfamily = os_family(os_id.as_deref(), &os_id_like).map(str::to_string);

        Self {
            hostname,
            fqdn,
            os_id,
            os_id_like,
            os_name: fields.get("PRETTY_NAME").cloned(),
            osfamily,
        }
    }
}

fn read_hostname() -> Result<String> {
    for path in ["/proc/sys/kernel/hostname", "/etc/hostname"] {
        if let Ok(name) = fs::read_to_string(path) {
            let name = name.trim();
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
    }
    std::env::var("HOSTNAME").context("Could not determine host name")
}

/// Parse `KEY=value` lines, unquoting values
pub fn parse_os_release(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Map os-release identifiers to an OS family; `ID` wins over `ID_LIKE`
pub fn os_family(id: Option<&str>, id_like: &[String]) -> Option<&'static str> {
    id.into_iter()
        .chain(id_like.iter().map(String::as_str))
        .find_map(family_of)
}

fn family_of(id: &str) -> Option<&'static str> {
    match id {
        "debian" | "ubuntu" | "raspbian" | "linuxmint" | "pop" => Some("Debian"),
        "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn" => Some("RedHat"),
        "suse" | "sles" | "sled" | "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => {
            Some("Suse")
        }
        "arch" | "archarm" | "manjaro" | "endeavouros" => Some("Archlinux"),
        _ => None,
    }
}
