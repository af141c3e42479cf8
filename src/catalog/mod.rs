//! Catalog compilation.
//!
//! [`compile`] turns a resolved parameter set into a [`Manifest`]: the
//! declarations for every resource the host should have, and the edges
//! between them. Compilation is pure. It reads nothing but the optional
//! external user source, and it never touches the managed system.

mod error;
mod platform;
mod template;
mod users;

pub use error::CompileError;
pub use platform::Platform;
pub use template::{HEADER, render_known_hosts, render_sshd_config};
pub use users::{LdapExport, UserSource, derive_allow_users};

use crate::facts::Facts;
use crate::schema::{GroupParams, KeyType, Params, UserParams};
use declarative::{Edge, ResourceId};
use hostkit::PackageEnsure;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Longest user or group name accepted by shadow-utils
const MAX_NAME_LEN: usize = 32;

/// Everything one run should converge
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub platform: Platform,
    /// Derived `AllowUsers`, `None` when unmanaged
    pub allow_users: Option<Vec<String>>,
    pub declarations: Vec<Declaration>,
    pub edges: Vec<Edge>,
}

impl Manifest {
    pub fn ids(&self) -> Vec<ResourceId> {
        self.declarations.iter().map(Declaration::id).collect()
    }

    /// Declarations of managed files with fixed content
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::File {
                path,
                content: Some(content),
                ..
            } => Some((path, content.as_str())),
            _ => None,
        })
    }
}

/// One resource, as data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Package {
        name: String,
        ensure: PackageEnsure,
    },
    File {
        path: PathBuf,
        /// `None` declares the file absent
        content: Option<String>,
        owner: String,
        group: String,
        mode: u32,
    },
    Service {
        name: String,
        running: bool,
        enabled: bool,
        hasrestart: bool,
        hasstatus: bool,
    },
    Group {
        name: String,
        params: GroupParams,
    },
    User {
        name: String,
        /// Entry merged over `users_default`
        params: UserParams,
    },
    Hostkey {
        name: String,
        dir: PathBuf,
        types: Vec<KeyType>,
    },
    KnownHosts {
        path: PathBuf,
        hostkey_name: String,
        aliases: Vec<String>,
        key_dir: PathBuf,
    },
}

impl Declaration {
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Package { name, .. } => ResourceId::new("Package", name),
            Self::File { path, .. } => ResourceId::new("File", path.display().to_string()),
            Self::Service { name, .. } => ResourceId::new("Service", name),
            Self::Group { name, .. } => ResourceId::new("Group", name),
            Self::User { name, .. } => ResourceId::new("User", name),
            Self::Hostkey { name, .. } => ResourceId::new("Hostkey", name),
            Self::KnownHosts { path, .. } => {
                ResourceId::new("KnownHosts", path.display().to_string())
            }
        }
    }
}

/// Compile a catalog for one host
pub fn compile(
    params: &Params,
    facts: &Facts,
    source: Option<&dyn UserSource>,
) -> Result<Manifest, CompileError> {
    let family = params
        .osfamily
        .clone()
        .or_else(|| facts.osfamily.clone())
        .or_else(|| facts.os_id.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let mut platform = Platform::for_family(&family)?;
    if let Some(dir) = &params.config_dir {
        platform.config_dir = dir.clone();
    }

    let allow_users = derive_allow_users(params, source)?;
    validate(params)?;

    let present = params.ensure.is_present();
    let service_name = params
        .service_name
        .clone()
        .unwrap_or_else(|| platform.service.clone());

    let mut declarations = Vec::new();
    let mut edges = Vec::new();

    let package = Declaration::Package {
        name: platform.package.clone(),
        ensure: params.ensure.clone(),
    };
    let package_id = package.id();
    declarations.push(package);

    let sshd_config = Declaration::File {
        path: platform.sshd_config(),
        content: present
            .then(|| render_sshd_config(params, &platform, allow_users.as_deref())),
        owner: "root".to_string(),
        group: "root".to_string(),
        mode: 0o644,
    };
    let config_id = sshd_config.id();
    declarations.push(sshd_config);
    edges.push(Edge::require(config_id.clone(), package_id.clone()));

    let service_id = if present {
        let service = Declaration::Service {
            name: service_name,
            running: params.ensure_running,
            enabled: params.ensure_enabled,
            hasrestart: true,
            hasstatus: true,
        };
        let id = service.id();
        declarations.push(service);
        edges.push(Edge::require(id.clone(), package_id.clone()));
        edges.push(Edge::notify(config_id, id.clone()));
        Some(id)
    } else {
        None
    };

    let mut group_ids = Vec::new();
    if params.manage_groups {
        for (name, group) in &params.groups {
            let declaration = Declaration::Group {
                name: name.clone(),
                params: group.clone(),
            };
            group_ids.push(declaration.id());
            declarations.push(declaration);
        }
    }
    if params.manage_users {
        for (name, user) in &params.users {
            let declaration = Declaration::User {
                name: name.clone(),
                params: user.merged_over(&params.users_default),
            };
            let user_id = declaration.id();
            for group_id in &group_ids {
                edges.push(Edge::before(group_id.clone(), user_id.clone()));
            }
            declarations.push(declaration);
        }
    }

    let mut hostkey_id = None;
    if present && params.manage_hostkey {
        let hostkey = Declaration::Hostkey {
            name: params.hostkey_name.clone(),
            dir: platform.config_dir.clone(),
            types: params.hostkey_types.clone(),
        };
        let id = hostkey.id();
        declarations.push(hostkey);
        edges.push(Edge::require(id.clone(), package_id.clone()));
        if let Some(service_id) = &service_id {
            edges.push(Edge::notify(id.clone(), service_id.clone()));
        }
        hostkey_id = Some(id);
    }

    if present && params.manage_known_hosts {
        let known_hosts = Declaration::KnownHosts {
            path: platform.known_hosts(),
            hostkey_name: params.hostkey_name.clone(),
            aliases: params.hostaliases.clone(),
            key_dir: platform.config_dir.clone(),
        };
        let id = known_hosts.id();
        declarations.push(known_hosts);
        edges.push(Edge::require(id.clone(), package_id));
        if let Some(hostkey_id) = hostkey_id {
            edges.push(Edge::require(id, hostkey_id));
        }
    }

    let manifest = Manifest {
        platform,
        allow_users,
        declarations,
        edges,
    };
    declarative::validate(&manifest.ids(), &manifest.edges)?;

    log::debug!(
        "compiled {} resources, {} edges for {}",
        manifest.declarations.len(),
        manifest.edges.len(),
        manifest.platform.family
    );
    Ok(manifest)
}

/// Portable user and group names, as accepted by shadow-utils
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_-]*[$]?$").expect("valid regex")
});

fn check_name(kind: &str, name: &str) -> Result<(), CompileError> {
    if name.len() > MAX_NAME_LEN || !NAME_RE.is_match(name) {
        return Err(CompileError::Validation(format!(
            "invalid {} name '{}': expected lowercase letters, digits, '_' or '-' (at most {} characters)",
            kind, name, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Checks that go beyond what parsing already enforces
fn validate(params: &Params) -> Result<(), CompileError> {
    if params.port == 0 {
        return Err(CompileError::Validation("port must be between 1 and 65535".into()));
    }
    if params.listen_address.iter().any(|a| a.trim().is_empty()) {
        return Err(CompileError::Validation(
            "listen_address entries cannot be empty".into(),
        ));
    }
    if (params.manage_hostkey || params.manage_known_hosts) && params.hostkey_name.trim().is_empty()
    {
        return Err(CompileError::Validation("hostkey_name cannot be empty".into()));
    }
    if params.manage_hostkey && params.hostkey_types.is_empty() {
        return Err(CompileError::Validation(
            "manage_hostkey requires at least one entry in hostkey_types".into(),
        ));
    }
    if let Some(name) = &params.service_name
        && name.trim().is_empty()
    {
        return Err(CompileError::Validation("service_name cannot be empty".into()));
    }

    for key in params.options.keys() {
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(CompileError::Validation(format!(
                "option key '{}' must be a single word",
                key
            )));
        }
        if let Some(parameter) = managed_directive(params, key) {
            return Err(CompileError::Conflict(format!(
                "option '{}' is managed through '{}'",
                key, parameter
            )));
        }
    }

    for name in params.groups.keys() {
        check_name("group", name)?;
    }
    for (name, user) in &params.users {
        check_name("user", name)?;
        let merged = user.merged_over(&params.users_default);
        if params.manage_groups
            && let Some(groups) = &merged.groups
            && let Some(unknown) = groups.iter().find(|g| !params.groups.contains_key(*g))
        {
            return Err(CompileError::Validation(format!(
                "user '{}' references undeclared group '{}'",
                name, unknown
            )));
        }
    }
    Ok(())
}

/// The parameter that owns `key`, when `key` is a rendered directive
fn managed_directive(params: &Params, key: &str) -> Option<&'static str> {
    let owned = [
        ("Port", "port", true),
        ("ListenAddress", "listen_address", true),
        ("PermitRootLogin", "permit_root_login", true),
        ("HostKey", "manage_hostkey", params.manage_hostkey),
        ("AllowUsers", "manage_users_allow", params.manage_users_allow),
    ];
    owned
        .iter()
        .find(|(directive, _, managed)| *managed && directive.eq_ignore_ascii_case(key))
        .map(|(_, parameter, _)| *parameter)
}
