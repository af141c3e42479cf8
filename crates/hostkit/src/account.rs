//! User and group accounts.
//!
//! Lookups go through NSS (`getent`), changes through the shadow-utils
//! tools (`useradd`, `usermod`, `userdel`, `groupadd`, `groupmod`,
//! `groupdel`).

use crate::command::CommandRunner;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A passwd entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub uid: u32,
    /// Primary group id
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

/// A group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Attributes to set on a user; `None` leaves the attribute alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttrs {
    pub uid: Option<u32>,
    /// Primary group name
    pub group: Option<String>,
    /// Complete supplementary group list
    pub groups: Option<Vec<String>>,
    pub home: Option<String>,
    pub shell: Option<String>,
    pub comment: Option<String>,
    /// Create (or move) the home directory
    pub manage_home: bool,
}

/// Interface to the host's account databases.
pub trait AccountManager: Send + Sync + fmt::Debug {
    fn user(&self, name: &str) -> Result<Option<UserEntry>>;

    fn user_by_uid(&self, uid: u32) -> Result<Option<UserEntry>>;

    fn group(&self, name: &str) -> Result<Option<GroupEntry>>;

    fn group_by_gid(&self, gid: u32) -> Result<Option<GroupEntry>>;

    /// Supplementary groups of a user, sorted by name.
    fn supplementary_groups(&self, user: &str) -> Result<Vec<String>>;

    fn create_user(&self, name: &str, attrs: &UserAttrs) -> Result<()>;

    fn modify_user(&self, name: &str, attrs: &UserAttrs) -> Result<()>;

    fn delete_user(&self, name: &str, remove_home: bool) -> Result<()>;

    fn create_group(&self, name: &str, gid: Option<u32>, system: bool) -> Result<()>;

    fn modify_group(&self, name: &str, gid: u32) -> Result<()>;

    fn delete_group(&self, name: &str) -> Result<()>;
}

/// Parse one `passwd` line: `name:x:uid:gid:gecos:home:shell`.
pub fn parse_passwd_line(line: &str) -> Option<UserEntry> {
    let fields: Vec<&str> = line.trim_end().split(':').collect();
    if fields.len() != 7 {
        return None;
    }
    Some(UserEntry {
        name: fields[0].to_string(),
        uid: fields[2].parse().ok()?,
        gid: fields[3].parse().ok()?,
        comment: fields[4].to_string(),
        home: fields[5].to_string(),
        shell: fields[6].to_string(),
    })
}

/// Parse one `group` line: `name:x:gid:member,member`.
pub fn parse_group_line(line: &str) -> Option<GroupEntry> {
    let fields: Vec<&str> = line.trim_end().split(':').collect();
    if fields.len() != 4 {
        return None;
    }
    Some(GroupEntry {
        name: fields[0].to_string(),
        gid: fields[2].parse().ok()?,
        members: fields[3]
            .split(',')
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// Accounts managed through getent and shadow-utils.
#[derive(Debug, Clone)]
pub struct SystemAccounts {
    runner: Arc<dyn CommandRunner>,
}

impl SystemAccounts {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `getent <db> <key>`; exit code 2 means the key does not exist
    fn getent(&self, database: &str, key: &str) -> Result<Option<String>> {
        let output = self.runner.run("getent", &[database, key])?;
        match output.code {
            Some(0) => Ok(Some(output.stdout)),
            Some(2) => Ok(None),
            code => Err(Error::from_command_output("getent", code, &output.stderr, key)),
        }
    }

    fn lookup_user(&self, key: &str) -> Result<Option<UserEntry>> {
        match self.getent("passwd", key)? {
            Some(line) => parse_passwd_line(&line).map(Some).ok_or_else(|| Error::Parse {
                program: "getent passwd".to_string(),
                message: line.trim().to_string(),
            }),
            None => Ok(None),
        }
    }

    fn lookup_group(&self, key: &str) -> Result<Option<GroupEntry>> {
        match self.getent("group", key)? {
            Some(line) => parse_group_line(&line).map(Some).ok_or_else(|| Error::Parse {
                program: "getent group".to_string(),
                message: line.trim().to_string(),
            }),
            None => Ok(None),
        }
    }
}

/// Arguments shared by useradd and usermod
fn user_args(attrs: &UserAttrs) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(uid) = attrs.uid {
        args.push("-u".to_string());
        args.push(uid.to_string());
    }
    if let Some(group) = &attrs.group {
        args.push("-g".to_string());
        args.push(group.clone());
    }
    if let Some(groups) = &attrs.groups {
        args.push("-G".to_string());
        args.push(groups.join(","));
    }
    if let Some(home) = &attrs.home {
        args.push("-d".to_string());
        args.push(home.clone());
    }
    if let Some(shell) = &attrs.shell {
        args.push("-s".to_string());
        args.push(shell.clone());
    }
    if let Some(comment) = &attrs.comment {
        args.push("-c".to_string());
        args.push(comment.clone());
    }
    args
}

impl AccountManager for SystemAccounts {
    fn user(&self, name: &str) -> Result<Option<UserEntry>> {
        self.lookup_user(name)
    }

    fn user_by_uid(&self, uid: u32) -> Result<Option<UserEntry>> {
        self.lookup_user(&uid.to_string())
    }

    fn group(&self, name: &str) -> Result<Option<GroupEntry>> {
        self.lookup_group(name)
    }

    fn group_by_gid(&self, gid: u32) -> Result<Option<GroupEntry>> {
        self.lookup_group(&gid.to_string())
    }

    fn supplementary_groups(&self, user: &str) -> Result<Vec<String>> {
        let output = self.runner.run_checked("getent", &["group"], user)?;
        let mut groups: Vec<String> = output
            .lines()
            .filter_map(parse_group_line)
            .filter(|g| g.members.iter().any(|m| m == user))
            .map(|g| g.name)
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }

    fn create_user(&self, name: &str, attrs: &UserAttrs) -> Result<()> {
        let mut args = user_args(attrs);
        args.push(if attrs.manage_home { "-m" } else { "-M" }.to_string());
        args.push(name.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run_checked("useradd", &args, name)?;
        Ok(())
    }

    fn modify_user(&self, name: &str, attrs: &UserAttrs) -> Result<()> {
        let mut args = user_args(attrs);
        if args.is_empty() {
            return Ok(());
        }
        if attrs.manage_home && attrs.home.is_some() {
            args.push("-m".to_string());
        }
        args.push(name.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run_checked("usermod", &args, name)?;
        Ok(())
    }

    fn delete_user(&self, name: &str, remove_home: bool) -> Result<()> {
        let args: &[&str] = if remove_home { &["-r", name] } else { &[name] };
        self.runner.run_checked("userdel", args, name)?;
        Ok(())
    }

    fn create_group(&self, name: &str, gid: Option<u32>, system: bool) -> Result<()> {
        let gid = gid.map(|g| g.to_string());
        let mut args = Vec::new();
        if let Some(gid) = &gid {
            args.extend(["-g", gid.as_str()]);
        }
        if system {
            args.push("-r");
        }
        args.push(name);
        self.runner.run_checked("groupadd", &args, name)?;
        Ok(())
    }

    fn modify_group(&self, name: &str, gid: u32) -> Result<()> {
        let gid = gid.to_string();
        self.runner.run_checked("groupmod", &["-g", &gid, name], name)?;
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        self.runner.run_checked("groupdel", &[name], name)?;
        Ok(())
    }
}
