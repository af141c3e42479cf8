//! In-memory host used to exercise convergence without touching the system.
//!
//! [`MemoryHost`] implements every collaborator trait over a shared state
//! table. Failures can be injected per operation, and every mutating call is
//! recorded.

use crate::account::{AccountManager, GroupEntry, UserAttrs, UserEntry};
use crate::error::{Error, Result};
use crate::keygen::KeyGenerator;
use crate::package::PackageManager;
use crate::service::ServiceManager;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// State of one service unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    pub active: bool,
    pub enabled: bool,
    pub restarts: usize,
}

#[derive(Debug, Default)]
struct State {
    installed: BTreeMap<String, String>,
    repository: BTreeMap<String, String>,
    services: BTreeMap<String, ServiceRecord>,
    users: BTreeMap<String, UserEntry>,
    groups: BTreeMap<String, GroupEntry>,
    failures: BTreeSet<String>,
    calls: Vec<String>,
    keys_generated: usize,
}

impl State {
    /// Record a mutating call, failing it if a failure was injected
    fn call(&mut self, operation: &str, name: &str) -> Result<()> {
        let key = format!("{}:{}", operation, name);
        self.calls.push(format!("{} {}", operation, name));
        if self.failures.contains(&key) {
            return Err(Error::CommandFailed {
                program: operation.to_string(),
                code: Some(1),
                stderr: format!("injected failure for {}", name),
            });
        }
        Ok(())
    }

    fn next_uid(&self) -> u32 {
        self.users
            .values()
            .map(|u| u.uid + 1)
            .filter(|&uid| uid >= 1000)
            .max()
            .unwrap_or(1000)
    }

    fn next_gid(&self) -> u32 {
        self.groups
            .values()
            .map(|g| g.gid + 1)
            .filter(|&gid| gid >= 1000)
            .max()
            .unwrap_or(1000)
    }

    fn gid_of(&self, group: &str) -> Result<u32> {
        if let Some(entry) = self.groups.get(group) {
            return Ok(entry.gid);
        }
        // Numeric ids are accepted like the shadow-utils tools do
        group
            .parse()
            .ok()
            .filter(|gid| self.groups.values().any(|g| g.gid == *gid))
            .ok_or_else(|| Error::NotFound {
                name: group.to_string(),
            })
    }

    fn set_membership(&mut self, user: &str, groups: &[String]) -> Result<()> {
        for group in groups {
            if !self.groups.contains_key(group) {
                return Err(Error::NotFound {
                    name: group.clone(),
                });
            }
        }
        for entry in self.groups.values_mut() {
            entry.members.retain(|m| m != user);
            if groups.contains(&entry.name) {
                entry.members.push(user.to_string());
            }
        }
        Ok(())
    }
}

/// A fake host: packages, services, accounts and key generation.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    /// An empty host with a `root` user and group (uid/gid 0).
    pub fn new() -> Self {
        let host = Self::default();
        host.seed_user(UserEntry {
            name: "root".to_string(),
            uid: 0,
            gid: 0,
            comment: "root".to_string(),
            home: "/root".to_string(),
            shell: "/bin/bash".to_string(),
        });
        host
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a package installable at the given candidate version.
    pub fn with_package_available(self, name: &str, version: &str) -> Self {
        self.state()
            .repository
            .insert(name.to_string(), version.to_string());
        self
    }

    /// Mark a package as installed.
    pub fn with_package_installed(self, name: &str, version: &str) -> Self {
        self.state()
            .installed
            .insert(name.to_string(), version.to_string());
        self
    }

    /// Declare a service unit in the given state.
    pub fn with_service(self, name: &str, active: bool, enabled: bool) -> Self {
        self.state().services.insert(
            name.to_string(),
            ServiceRecord {
                active,
                enabled,
                restarts: 0,
            },
        );
        self
    }

    /// Add (or replace) a user, creating its primary group with the same id.
    pub fn seed_user(&self, user: UserEntry) {
        let mut state = self.state();
        if !state.groups.values().any(|g| g.gid == user.gid) {
            state.groups.insert(
                user.name.clone(),
                GroupEntry {
                    name: user.name.clone(),
                    gid: user.gid,
                    members: Vec::new(),
                },
            );
        }
        state.users.insert(user.name.clone(), user);
    }

    /// Add (or replace) a group.
    pub fn seed_group(&self, group: GroupEntry) {
        self.state().groups.insert(group.name.clone(), group);
    }

    /// Make the next `operation` on `name` fail, e.g. `("install", "openssh-server")`.
    pub fn fail_on(&self, operation: &str, name: &str) {
        self.state()
            .failures
            .insert(format!("{}:{}", operation, name));
    }

    /// Every mutating call so far, as `"<operation> <name>"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn package_version(&self, name: &str) -> Option<String> {
        self.state().installed.get(name).cloned()
    }

    pub fn service_record(&self, name: &str) -> Option<ServiceRecord> {
        self.state().services.get(name).copied()
    }

    pub fn user_entry(&self, name: &str) -> Option<UserEntry> {
        self.state().users.get(name).cloned()
    }

    pub fn group_entry(&self, name: &str) -> Option<GroupEntry> {
        self.state().groups.get(name).cloned()
    }
}

impl PackageManager for MemoryHost {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn installed_version(&self, package: &str) -> Result<Option<String>> {
        Ok(self.state().installed.get(package).cloned())
    }

    fn candidate_version(&self, package: &str) -> Result<Option<String>> {
        Ok(self.state().repository.get(package).cloned())
    }

    fn install(&self, package: &str, version: Option<&str>) -> Result<()> {
        let mut state = self.state();
        state.call("install", package)?;
        let version = match version {
            Some(v) => v.to_string(),
            None => state
                .repository
                .get(package)
                .cloned()
                .ok_or_else(|| Error::NotFound {
                    name: package.to_string(),
                })?,
        };
        state.installed.insert(package.to_string(), version);
        Ok(())
    }

    fn remove(&self, package: &str) -> Result<()> {
        let mut state = self.state();
        state.call("remove", package)?;
        state.installed.remove(package);
        Ok(())
    }
}

impl ServiceManager for MemoryHost {
    fn is_active(&self, service: &str) -> Result<bool> {
        Ok(self.state().services.get(service).is_some_and(|s| s.active))
    }

    fn process_running(&self, process: &str) -> Result<bool> {
        self.is_active(process)
    }

    fn is_enabled(&self, service: &str) -> Result<bool> {
        Ok(self.state().services.get(service).is_some_and(|s| s.enabled))
    }

    fn start(&self, service: &str) -> Result<()> {
        let mut state = self.state();
        state.call("start", service)?;
        state.services.entry(service.to_string()).or_default().active = true;
        Ok(())
    }

    fn stop(&self, service: &str) -> Result<()> {
        let mut state = self.state();
        state.call("stop", service)?;
        state.services.entry(service.to_string()).or_default().active = false;
        Ok(())
    }

    fn enable(&self, service: &str) -> Result<()> {
        let mut state = self.state();
        state.call("enable", service)?;
        state.services.entry(service.to_string()).or_default().enabled = true;
        Ok(())
    }

    fn disable(&self, service: &str) -> Result<()> {
        let mut state = self.state();
        state.call("disable", service)?;
        state.services.entry(service.to_string()).or_default().enabled = false;
        Ok(())
    }

    fn restart(&self, service: &str) -> Result<()> {
        let mut state = self.state();
        state.call("restart", service)?;
        let record = state.services.entry(service.to_string()).or_default();
        record.active = true;
        record.restarts += 1;
        Ok(())
    }
}

impl AccountManager for MemoryHost {
    fn user(&self, name: &str) -> Result<Option<UserEntry>> {
        Ok(self.state().users.get(name).cloned())
    }

    fn user_by_uid(&self, uid: u32) -> Result<Option<UserEntry>> {
        Ok(self.state().users.values().find(|u| u.uid == uid).cloned())
    }

    fn group(&self, name: &str) -> Result<Option<GroupEntry>> {
        Ok(self.state().groups.get(name).cloned())
    }

    fn group_by_gid(&self, gid: u32) -> Result<Option<GroupEntry>> {
        Ok(self.state().groups.values().find(|g| g.gid == gid).cloned())
    }

    fn supplementary_groups(&self, user: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .groups
            .values()
            .filter(|g| g.members.iter().any(|m| m == user))
            .map(|g| g.name.clone())
            .collect())
    }

    fn create_user(&self, name: &str, attrs: &UserAttrs) -> Result<()> {
        let mut state = self.state();
        state.call("useradd", name)?;
        if state.users.contains_key(name) {
            return Err(Error::CommandFailed {
                program: "useradd".to_string(),
                code: Some(9),
                stderr: format!("useradd: user '{}' already exists", name),
            });
        }

        if let Some(groups) = &attrs.groups {
            state.set_membership(name, groups)?;
        }
        let gid = match &attrs.group {
            Some(group) => state.gid_of(group)?,
            None => {
                let gid = state.next_gid();
                state.groups.insert(
                    name.to_string(),
                    GroupEntry {
                        name: name.to_string(),
                        gid,
                        members: Vec::new(),
                    },
                );
                gid
            }
        };

        let uid = attrs.uid.unwrap_or_else(|| state.next_uid());
        state.users.insert(
            name.to_string(),
            UserEntry {
                name: name.to_string(),
                uid,
                gid,
                comment: attrs.comment.clone().unwrap_or_default(),
                home: attrs.home.clone().unwrap_or_else(|| format!("/home/{}", name)),
                shell: attrs.shell.clone().unwrap_or_else(|| "/bin/sh".to_string()),
            },
        );
        Ok(())
    }

    fn modify_user(&self, name: &str, attrs: &UserAttrs) -> Result<()> {
        let mut state = self.state();
        state.call("usermod", name)?;
        let gid = match &attrs.group {
            Some(group) => Some(state.gid_of(group)?),
            None => None,
        };
        if let Some(groups) = &attrs.groups {
            state.set_membership(name, groups)?;
        }

        let user = state.users.get_mut(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        if let Some(uid) = attrs.uid {
            user.uid = uid;
        }
        if let Some(gid) = gid {
            user.gid = gid;
        }
        if let Some(home) = &attrs.home {
            user.home = home.clone();
        }
        if let Some(shell) = &attrs.shell {
            user.shell = shell.clone();
        }
        if let Some(comment) = &attrs.comment {
            user.comment = comment.clone();
        }
        Ok(())
    }

    fn delete_user(&self, name: &str, _remove_home: bool) -> Result<()> {
        let mut state = self.state();
        state.call("userdel", name)?;
        state.users.remove(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        state.set_membership(name, &[])?;
        Ok(())
    }

    fn create_group(&self, name: &str, gid: Option<u32>, _system: bool) -> Result<()> {
        let mut state = self.state();
        state.call("groupadd", name)?;
        let gid = gid.unwrap_or_else(|| state.next_gid());
        state.groups.insert(
            name.to_string(),
            GroupEntry {
                name: name.to_string(),
                gid,
                members: Vec::new(),
            },
        );
        Ok(())
    }

    fn modify_group(&self, name: &str, gid: u32) -> Result<()> {
        let mut state = self.state();
        state.call("groupmod", name)?;
        let group = state.groups.get_mut(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        group.gid = gid;
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.call("groupdel", name)?;
        state.groups.remove(name).ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })?;
        Ok(())
    }
}

/// Public key algorithm name for an `ssh-keygen -t` type
fn algorithm(key_type: &str) -> String {
    match key_type {
        "rsa" => "ssh-rsa".to_string(),
        "ecdsa" => "ecdsa-sha2-nistp256".to_string(),
        "ed25519" => "ssh-ed25519".to_string(),
        other => format!("ssh-{}", other),
    }
}

impl KeyGenerator for MemoryHost {
    fn generate(&self, key_type: &str, path: &Path, comment: &str) -> Result<()> {
        let mut state = self.state();
        state.call("ssh-keygen", &path.to_string_lossy())?;
        state.keys_generated += 1;

        let mut public = PathBuf::from(path);
        public.as_mut_os_string().push(".pub");
        fs::write(path, format!("memory {} private key\n", key_type))?;
        fs::write(
            &public,
            format!(
                "{} AAAAmemory{:04} {}\n",
                algorithm(key_type),
                state.keys_generated,
                comment
            ),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packages() {
        let host = MemoryHost::new().with_package_available("openssh-server", "9.6");
        assert_eq!(host.installed_version("openssh-server").unwrap(), None);
        host.install("openssh-server", None).unwrap();
        assert_eq!(host.package_version("openssh-server").as_deref(), Some("9.6"));
        host.remove("openssh-server").unwrap();
        assert_eq!(host.package_version("openssh-server"), None);
        assert!(host.install("unknown", None).is_err());
    }

    #[test]
    fn test_injected_failure() {
        let host = MemoryHost::new().with_package_available("openssh", "9.7");
        host.fail_on("install", "openssh");
        let err = host.install("openssh", None).unwrap_err();
        assert!(err.to_string().contains("injected failure"));
        assert_eq!(host.calls(), vec!["install openssh"]);
    }

    #[test]
    fn test_user_requires_existing_groups() {
        let host = MemoryHost::new();
        let attrs = UserAttrs {
            groups: Some(vec!["sshusers".into()]),
            ..Default::default()
        };
        assert!(matches!(
            host.create_user("alice", &attrs),
            Err(Error::NotFound { .. })
        ));

        host.create_group("sshusers", Some(2000), false).unwrap();
        host.create_user("alice", &attrs).unwrap();
        assert_eq!(host.supplementary_groups("alice").unwrap(), vec!["sshusers"]);
        let alice = host.user_entry("alice").unwrap();
        assert_eq!(alice.uid, 1000);
        assert_eq!(alice.gid, 2001);
        assert_eq!(host.group_by_gid(alice.gid).unwrap().unwrap().name, "alice");
    }

    #[test]
    fn test_restart_counts() {
        let host = MemoryHost::new().with_service("sshd", true, true);
        host.restart("sshd").unwrap();
        assert_eq!(host.service_record("sshd").unwrap().restarts, 1);
        assert!(host.process_running("sshd").unwrap());
    }

    #[test]
    fn test_keygen_writes_pair() {
        let dir = tempfile::tempdir().unwrap();
        let host = MemoryHost::new();
        let key = dir.path().join("ssh_host_ed25519_key");
        host.generate("ed25519", &key, "host.example.com").unwrap();
        assert!(key.exists());
        let public = fs::read_to_string(dir.path().join("ssh_host_ed25519_key.pub")).unwrap();
        assert!(public.starts_with("ssh-ed25519 AAAAmemory0001 host.example.com"));
    }
}
