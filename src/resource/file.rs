//! Managed file resource
//!
//! Content is compared by blake3 digest, so reports never carry file bodies.
//! Writes go to a temporary sibling first and are renamed into place.

use anyhow::{Context, Result, bail};
use declarative::{ApplyContext, Change, ENSURE, Resource, ResourceId, ResourceState, find_change};
use hostkit::AccountManager;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Short content digest used as the `content` property
fn content_digest(content: &[u8]) -> String {
    let hash = blake3::hash(content).to_hex();
    format!("{{blake3}}{}", &hash.as_str()[..16])
}

/// Path, ownership and mode of a managed file; shared with generated files
#[derive(Debug, Clone)]
pub(crate) struct FileSpec {
    /// Where the file actually lives (after `--root`)
    pub path: PathBuf,
    pub owner: String,
    pub group: String,
    pub mode: u32,
    pub accounts: Arc<dyn AccountManager>,
}

impl FileSpec {
    /// Observed state: ensure, content digest, owner, group, mode
    pub fn observe(&self) -> Result<ResourceState> {
        let meta = match fs::symlink_metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ResourceState::absent());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not stat {}", self.path.display()));
            }
        };
        if !meta.is_file() {
            bail!("{} exists but is not a regular file", self.path.display());
        }

        let content = fs::read(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        let owner = match self.accounts.user_by_uid(meta.uid())? {
            Some(user) => user.name,
            None => meta.uid().to_string(),
        };
        let group = match self.accounts.group_by_gid(meta.gid())? {
            Some(group) => group.name,
            None => meta.gid().to_string(),
        };

        Ok(ResourceState::new()
            .with(ENSURE, "present")
            .with("content", content_digest(&content))
            .with("owner", owner)
            .with("group", group)
            .with("mode", format_mode(meta.mode())))
    }

    /// Desired state for the given body
    pub fn desired(&self, content: &str) -> ResourceState {
        ResourceState::new()
            .with(ENSURE, "present")
            .with("content", content_digest(content.as_bytes()))
            .with("owner", &self.owner)
            .with("group", &self.group)
            .with("mode", format_mode(self.mode))
    }

    /// Apply a delta computed against [`FileSpec::desired`]
    pub fn converge(&self, content: &str, changes: &[Change]) -> Result<()> {
        let rewrite = find_change(changes, ENSURE).is_some()
            || find_change(changes, "content").is_some();
        if rewrite {
            self.write(content)?;
        }
        if rewrite || find_change(changes, "mode").is_some() {
            fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode))
                .with_context(|| format!("Could not set mode on {}", self.path.display()))?;
        }
        if rewrite
            || find_change(changes, "owner").is_some()
            || find_change(changes, "group").is_some()
        {
            self.chown()?;
        }
        Ok(())
    }

    /// Remove the file if it exists
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Could not remove {}", self.path.display())),
        }
    }

    fn write(&self, content: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let staging = parent.join(format!(".{}.sshcm-tmp", file_name));
        fs::write(&staging, content)
            .with_context(|| format!("Could not write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Could not move {} into place", self.path.display()))?;
        Ok(())
    }

    fn chown(&self) -> Result<()> {
        let uid = self
            .accounts
            .user(&self.owner)?
            .with_context(|| format!("Owner '{}' does not exist", self.owner))?
            .uid;
        let gid = self
            .accounts
            .group(&self.group)?
            .with_context(|| format!("Group '{}' does not exist", self.group))?
            .gid;
        std::os::unix::fs::chown(&self.path, Some(uid), Some(gid))
            .with_context(|| format!("Could not chown {}", self.path.display()))?;
        Ok(())
    }
}

fn format_mode(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

/// A file with fixed content, or declared absent
#[derive(Debug, Clone)]
pub struct File {
    /// Path as declared, used for identity
    pub title: PathBuf,
    /// `None` means the file must not exist
    pub content: Option<String>,
    spec: FileSpec,
}

impl File {
    pub fn new(
        title: &Path,
        path: PathBuf,
        content: Option<String>,
        owner: &str,
        group: &str,
        mode: u32,
        accounts: Arc<dyn AccountManager>,
    ) -> Self {
        Self {
            title: title.to_path_buf(),
            content,
            spec: FileSpec {
                path,
                owner: owner.to_string(),
                group: group.to_string(),
                mode,
                accounts,
            },
        }
    }
}

impl Resource for File {
    fn id(&self) -> ResourceId {
        ResourceId::new("File", self.title.display().to_string())
    }

    fn description(&self) -> String {
        match &self.content {
            Some(_) => format!(
                "{} ({}:{} {:04o})",
                self.spec.path.display(),
                self.spec.owner,
                self.spec.group,
                self.spec.mode
            ),
            None => format!("{} (absent)", self.spec.path.display()),
        }
    }

    fn lock_key(&self) -> String {
        format!("file:{}", self.spec.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        self.spec.observe()
    }

    fn desired_state(&self) -> ResourceState {
        match &self.content {
            Some(content) => self.spec.desired(content),
            None => ResourceState::absent(),
        }
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        match &self.content {
            Some(content) => self.spec.converge(content, changes),
            None => self.spec.remove(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::memory_host;
    use declarative::ResourceExt;

    fn file(dir: &Path, content: Option<&str>) -> File {
        let host = memory_host(dir);
        File::new(
            Path::new("/etc/ssh/sshd_config"),
            dir.join("etc/ssh/sshd_config"),
            content.map(str::to_string),
            "root",
            "root",
            0o644,
            host,
        )
    }

    #[test]
    fn test_create_then_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let resource = file(dir.path(), Some("Port 22\n"));

        let changes = resource.delta().unwrap();
        assert_eq!(changes.len(), 5);
        assert_eq!(changes[0].property, "content");
        resource.apply(&changes, &ApplyContext::default()).unwrap();

        let path = dir.path().join("etc/ssh/sshd_config");
        assert_eq!(fs::read_to_string(&path).unwrap(), "Port 22\n");
        assert_eq!(fs::metadata(&path).unwrap().mode() & 0o7777, 0o644);
        assert!(resource.is_converged().unwrap());
        assert!(!dir.path().join("etc/ssh/.sshd_config.sshcm-tmp").exists());
    }

    #[test]
    fn test_content_change_reports_digests() {
        let dir = tempfile::tempdir().unwrap();
        let old = file(dir.path(), Some("Port 22\n"));
        old.apply(&old.delta().unwrap(), &ApplyContext::default()).unwrap();

        let new = file(dir.path(), Some("Port 2222\n"));
        let changes = new.delta().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].property, "content");
        assert_eq!(
            changes[0].from.as_deref(),
            Some(content_digest(b"Port 22\n").as_str())
        );
        assert!(changes[0].to.starts_with("{blake3}"));
    }

    #[test]
    fn test_mode_drift_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let resource = file(dir.path(), Some("Port 22\n"));
        resource
            .apply(&resource.delta().unwrap(), &ApplyContext::default())
            .unwrap();

        let path = dir.path().join("etc/ssh/sshd_config");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();
        let changes = resource.delta().unwrap();
        assert_eq!(changes, vec![Change::new("mode", Some("0666"), "0644")]);
        resource.apply(&changes, &ApplyContext::default()).unwrap();
        assert!(resource.is_converged().unwrap());
    }

    #[test]
    fn test_absent_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/ssh/sshd_config");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();

        let resource = file(dir.path(), None);
        let changes = resource.delta().unwrap();
        assert_eq!(changes, vec![Change::new(ENSURE, Some("present"), "absent")]);
        resource.apply(&changes, &ApplyContext::default()).unwrap();
        assert!(!path.exists());
        assert!(resource.is_converged().unwrap());
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
        assert_eq!(content_digest(b"abc").len(), "{blake3}".len() + 16);
    }
}
