//! Parameter schema for the SSH module.
//!
//! [`Params`] is the fully resolved parameter set: every layer has been
//! merged and every required key is present (see `config.rs`).

use hostkit::PackageEnsure;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Parameter Set
// ============================================================================

/// The resolved parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Package state: present, absent, latest or a version
    pub ensure: PackageEnsure,
    pub ensure_running: bool,
    pub ensure_enabled: bool,
    pub permit_root_login: PermitRootLogin,
    pub port: u16,
    /// Addresses for `ListenAddress`; a single string is accepted
    #[serde(deserialize_with = "one_or_many")]
    pub listen_address: Vec<String>,

    pub manage_known_hosts: bool,
    pub manage_users: bool,
    /// Derive an `AllowUsers` directive
    pub manage_users_allow: bool,
    pub manage_groups: bool,
    pub manage_hostkey: bool,

    pub hostkey_name: String,
    #[serde(deserialize_with = "one_or_many")]
    pub hostaliases: Vec<String>,
    pub hostkey_types: Vec<KeyType>,

    pub users: BTreeMap<String, UserParams>,
    /// Merged under every entry of `users`
    pub users_default: UserParams,
    pub groups: BTreeMap<String, GroupParams>,

    /// Overrides the platform's service name
    #[serde(default)]
    pub service_name: Option<String>,
    /// Extra `sshd_config` directives
    pub options: BTreeMap<String, OptionValue>,

    /// Take the allow-list from the external user source
    pub use_ldapuser: bool,
    /// Export file read when `use_ldapuser` is on
    #[serde(default)]
    pub ldapuser_source: Option<PathBuf>,

    /// Overrides the OS family detected from facts
    #[serde(default)]
    pub osfamily: Option<String>,
    /// Overrides the platform's SSH config directory
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
}

/// Keys that must have a value once every layer is merged
pub const REQUIRED_KEYS: &[&str] = &[
    "ensure",
    "ensure_running",
    "ensure_enabled",
    "permit_root_login",
    "port",
    "listen_address",
    "manage_known_hosts",
    "manage_users",
    "manage_users_allow",
    "manage_groups",
    "manage_hostkey",
    "hostkey_name",
    "hostaliases",
    "hostkey_types",
    "users",
    "users_default",
    "groups",
    "options",
    "use_ldapuser",
];

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

// ============================================================================
// Enumerations
// ============================================================================

/// Values accepted by `PermitRootLogin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermitRootLogin {
    Yes,
    No,
    WithoutPassword,
    ProhibitPassword,
    ForcedCommandsOnly,
}

impl PermitRootLogin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::WithoutPassword => "without-password",
            Self::ProhibitPassword => "prohibit-password",
            Self::ForcedCommandsOnly => "forced-commands-only",
        }
    }
}

impl fmt::Display for PermitRootLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host key algorithms understood by `ssh-keygen -t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ecdsa,
    Ed25519,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ecdsa => "ecdsa",
            Self::Ed25519 => "ed25519",
        }
    }

    /// Private key file name, e.g. `ssh_host_ed25519_key`
    pub fn file_name(&self) -> String {
        format!("ssh_host_{}_key", self.as_str())
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// One entry of `users` (or `users_default`); unset fields are unmanaged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Presence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    /// Primary group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Complete supplementary group list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managehome: Option<bool>,
}

impl UserParams {
    /// Field-by-field merge: fields set on `self` win over `defaults`
    pub fn merged_over(&self, defaults: &UserParams) -> UserParams {
        UserParams {
            ensure: self.ensure.or(defaults.ensure),
            uid: self.uid.or(defaults.uid),
            group: self.group.clone().or_else(|| defaults.group.clone()),
            groups: self.groups.clone().or_else(|| defaults.groups.clone()),
            home: self.home.clone().or_else(|| defaults.home.clone()),
            shell: self.shell.clone().or_else(|| defaults.shell.clone()),
            comment: self.comment.clone().or_else(|| defaults.comment.clone()),
            managehome: self.managehome.or(defaults.managehome),
        }
    }

    pub fn presence(&self) -> Presence {
        self.ensure.unwrap_or_default()
    }
}

/// One entry of `groups`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Presence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    /// Allocate from the system id range
    #[serde(default)]
    pub system: bool,
}

impl GroupParams {
    pub fn presence(&self) -> Presence {
        self.ensure.unwrap_or_default()
    }
}

// ============================================================================
// sshd_config Options
// ============================================================================

/// Value of an `options` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    /// One directive line per element
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Directive arguments, one entry per rendered line
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Bool(true) => vec!["yes".to_string()],
            Self::Bool(false) => vec!["no".to_string()],
            Self::Integer(n) => vec![n.to_string()],
            Self::Text(s) => vec![s.clone()],
            Self::List(items) => items.iter().flat_map(OptionValue::lines).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
