//! Concrete resources for the SSH catalog
//!
//! Every [`Declaration`] becomes one resource implementing
//! [`declarative::Resource`]. Resources talk to the host only through the
//! collaborators bundled in [`Host`], so the same catalog converges against
//! the real system or against [`hostkit::MemoryHost`] in tests.

mod file;
mod group;
mod hostkey;
mod known_hosts;
mod package;
mod service;
mod user;

pub use file::File;
pub use group::Group;
pub use hostkey::Hostkey;
pub use known_hosts::KnownHosts;
pub use package::Package;
pub use service::Service;
pub use user::User;

use crate::catalog::{Declaration, Manifest};
use crate::paths;
use anyhow::Result;
use declarative::{BoxedResource, Catalog, GraphError};
use hostkit::{
    AccountManager, CommandRunner, KeyGenerator, PackageManager, ServiceManager, SshKeygen,
    SystemAccounts, SystemRunner, Systemd,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Collaborators the resources converge through
#[derive(Debug, Clone)]
pub struct Host {
    pub packages: Arc<dyn PackageManager>,
    pub services: Arc<dyn ServiceManager>,
    pub accounts: Arc<dyn AccountManager>,
    pub keygen: Arc<dyn KeyGenerator>,
    /// Prefix for every managed path
    pub root: Option<PathBuf>,
}

impl Host {
    /// The running system, with the package manager for `family`
    pub fn system(family: &str, root: Option<PathBuf>) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> =
            Arc::new(SystemRunner::new().with_env("LC_ALL", "C"));
        Ok(Self {
            packages: hostkit::package::for_os_family(family, runner.clone())?,
            services: Arc::new(Systemd::new(runner.clone())),
            accounts: Arc::new(SystemAccounts::new(runner.clone())),
            keygen: Arc::new(SshKeygen::new(runner)),
            root,
        })
    }

    /// An in-memory host; files still live under `root`
    #[cfg(test)]
    pub fn memory(host: Arc<hostkit::MemoryHost>, root: Option<PathBuf>) -> Self {
        Self {
            packages: host.clone(),
            services: host.clone(),
            accounts: host.clone(),
            keygen: host,
            root,
        }
    }

    /// Where a managed path lives on this host
    pub fn path(&self, path: &Path) -> PathBuf {
        paths::under_root(self.root.as_deref(), path)
    }
}

/// Turn a manifest into executable resources
pub fn instantiate(manifest: &Manifest, host: &Host) -> Result<Catalog, GraphError> {
    let mut catalog = Catalog::new();
    for declaration in &manifest.declarations {
        catalog.add(build(declaration, host))?;
    }
    for edge in &manifest.edges {
        catalog.relate(edge.clone());
    }
    Ok(catalog)
}

fn build(declaration: &Declaration, host: &Host) -> BoxedResource {
    match declaration {
        Declaration::Package { name, ensure } => {
            Arc::new(Package::new(name, ensure.clone(), host.packages.clone()))
        }
        Declaration::File {
            path,
            content,
            owner,
            group,
            mode,
        } => Arc::new(File::new(
            path,
            host.path(path),
            content.clone(),
            owner,
            group,
            *mode,
            host.accounts.clone(),
        )),
        Declaration::Service {
            name,
            running,
            enabled,
            hasrestart,
            hasstatus,
        } => Arc::new(Service {
            name: name.clone(),
            running: *running,
            enabled: *enabled,
            hasrestart: *hasrestart,
            hasstatus: *hasstatus,
            services: host.services.clone(),
        }),
        Declaration::Group { name, params } => {
            Arc::new(Group::new(name, params.clone(), host.accounts.clone()))
        }
        Declaration::User { name, params } => {
            Arc::new(User::new(name, params.clone(), host.accounts.clone()))
        }
        Declaration::Hostkey { name, dir, types } => Arc::new(Hostkey::new(
            name,
            host.path(dir),
            types.clone(),
            host.keygen.clone(),
        )),
        Declaration::KnownHosts {
            path,
            hostkey_name,
            aliases,
            key_dir,
        } => Arc::new(KnownHosts::new(
            path,
            host.path(path),
            hostkey_name,
            aliases.clone(),
            host.path(key_dir),
            host.accounts.clone(),
        )),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::compile;
    use crate::config::tests::params_with;
    use crate::facts::Facts;
    use declarative::{
        CancelToken, ExecuteOptions, NoProgress, ResourceId, ResourceStatus, RunReport, execute,
    };
    use hostkit::{GroupEntry, MemoryHost, UserEntry};
    use std::fs;
    use std::os::unix::fs::MetadataExt;

    /// A memory host whose `root` account owns files this process creates
    pub fn memory_host(dir: &Path) -> Arc<MemoryHost> {
        let marker = dir.join(".owner-check");
        fs::write(&marker, "").unwrap();
        let meta = fs::metadata(&marker).unwrap();
        fs::remove_file(&marker).unwrap();

        let host = Arc::new(
            MemoryHost::new()
                .with_package_available("openssh-server", "1:9.6p1-3")
                .with_service("ssh", false, false),
        );
        host.seed_user(UserEntry {
            name: "root".into(),
            uid: meta.uid(),
            gid: meta.gid(),
            comment: "root".into(),
            home: "/root".into(),
            shell: "/bin/bash".into(),
        });
        host.seed_group(GroupEntry {
            name: "root".into(),
            gid: meta.gid(),
            members: Vec::new(),
        });
        host
    }

    fn run(params: &str, host: &Arc<MemoryHost>, root: &Path) -> RunReport {
        let facts = Facts::from_parts("web1".into(), "web1.example.com".into(), "ID=debian\n");
        let manifest = compile(&params_with(params), &facts, None).unwrap();
        let graph = instantiate(&manifest, &Host::memory(host.clone(), Some(root.to_path_buf())))
            .unwrap()
            .into_graph()
            .unwrap();
        execute(
            &graph,
            &ExecuteOptions::default(),
            &CancelToken::new(),
            &mut NoProgress,
        )
        .unwrap()
    }

    const FULL: &str = r#"
        manage_users = true
        manage_groups = true
        manage_users_allow = true
        [groups.sshusers]
        gid = 2000
        [users.alice]
        groups = ["sshusers"]
    "#;

    #[test]
    fn test_first_run_converges_everything() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        let report = run(FULL, &host, dir.path());

        assert!(report.is_success(), "{:?}", report.failed().collect::<Vec<_>>());
        assert_eq!(host.package_version("openssh-server").as_deref(), Some("1:9.6p1-3"));
        let service = host.service_record("ssh").unwrap();
        assert!(service.active && service.enabled);
        assert_eq!(host.supplementary_groups("alice").unwrap(), vec!["sshusers"]);

        let config = fs::read_to_string(dir.path().join("etc/ssh/sshd_config")).unwrap();
        assert!(config.contains("\nAllowUsers alice\n"));
        let known_hosts = fs::read_to_string(dir.path().join("etc/ssh/ssh_known_hosts")).unwrap();
        assert_eq!(known_hosts.lines().count(), 4);
        assert!(known_hosts.contains("web1.example.com ssh-ed25519 AAAAmemory"));
    }

    #[test]
    fn test_second_run_has_no_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        run(FULL, &host, dir.path());
        let calls_after_first = host.calls().len();

        let report = run(FULL, &host, dir.path());
        assert!(report.is_success());
        for resource in &report.resources {
            assert_eq!(resource.status, ResourceStatus::NoChange, "{}", resource.id);
            assert!(resource.changes.is_empty());
        }
        assert_eq!(host.calls().len(), calls_after_first);
        assert_eq!(host.service_record("ssh").unwrap().restarts, 0);
    }

    #[test]
    fn test_config_change_restarts_service_once() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        run(FULL, &host, dir.path());

        let report = run(&format!("port = 2222\n{}", FULL), &host, dir.path());
        let config = report
            .get(&ResourceId::new("File", "/etc/ssh/sshd_config"))
            .unwrap();
        assert_eq!(config.status, ResourceStatus::Applied);
        let service = report.get(&ResourceId::new("Service", "ssh")).unwrap();
        assert_eq!(service.status, ResourceStatus::NoChange);
        assert!(service.refreshed);
        assert_eq!(host.service_record("ssh").unwrap().restarts, 1);
    }

    #[test]
    fn test_groups_converge_before_users() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        run(FULL, &host, dir.path());

        let calls = host.calls();
        let groupadd = calls.iter().position(|c| c == "groupadd sshusers").unwrap();
        let useradd = calls.iter().position(|c| c == "useradd alice").unwrap();
        assert!(groupadd < useradd);
    }

    #[test]
    fn test_hostkey_converges_before_known_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        let report = run("", &host, dir.path());

        let hostkey = report
            .position(&ResourceId::new("Hostkey", "web1.example.com"))
            .unwrap();
        let known_hosts = report
            .position(&ResourceId::new("KnownHosts", "/etc/ssh/ssh_known_hosts"))
            .unwrap();
        assert!(hostkey < known_hosts);
    }

    #[test]
    fn test_failed_package_skips_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let host = memory_host(dir.path());
        host.fail_on("install", "openssh-server");
        let report = run(FULL, &host, dir.path());

        assert!(!report.is_success());
        let package = report
            .get(&ResourceId::new("Package", "openssh-server"))
            .unwrap();
        assert_eq!(package.status, ResourceStatus::Failed);
        let config = report
            .get(&ResourceId::new("File", "/etc/ssh/sshd_config"))
            .unwrap();
        assert_eq!(config.status, ResourceStatus::Skipped);
        assert!(!dir.path().join("etc/ssh/sshd_config").exists());

        // Accounts do not depend on the package
        let alice = report.get(&ResourceId::new("User", "alice")).unwrap();
        assert_eq!(alice.status, ResourceStatus::Applied);
    }
}
