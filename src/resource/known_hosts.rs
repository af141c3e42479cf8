//! Known hosts resource
//!
//! Renders the system `ssh_known_hosts` from the public host keys found on
//! disk when the resource is converged, so keys generated earlier in the same
//! run are included.

use super::file::FileSpec;
use crate::catalog::render_known_hosts;
use anyhow::{Context, Result};
use declarative::{ApplyContext, Change, Resource, ResourceId, ResourceState};
use hostkit::AccountManager;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct KnownHosts {
    pub title: PathBuf,
    pub hostkey_name: String,
    pub aliases: Vec<String>,
    /// Directory holding `ssh_host_*_key.pub`
    pub key_dir: PathBuf,
    spec: FileSpec,
}

impl KnownHosts {
    pub fn new(
        title: &Path,
        path: PathBuf,
        hostkey_name: &str,
        aliases: Vec<String>,
        key_dir: PathBuf,
        accounts: Arc<dyn AccountManager>,
    ) -> Self {
        Self {
            title: title.to_path_buf(),
            hostkey_name: hostkey_name.to_string(),
            aliases,
            key_dir,
            spec: FileSpec {
                path,
                owner: "root".to_string(),
                group: "root".to_string(),
                mode: 0o644,
                accounts,
            },
        }
    }

    /// Public host keys as `(algorithm, key)`, ordered by file name
    fn public_keys(&self) -> Result<Vec<(String, String)>> {
        if !self.key_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&self.key_dir).max_depth(1) {
            let entry = entry.with_context(|| format!("Could not list {}", self.key_dir.display()))?;
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_file() && name.starts_with("ssh_host_") && name.ends_with("_key.pub") {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();

        let mut keys = Vec::new();
        for path in files {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let mut fields = content.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(algorithm), Some(key)) => keys.push((algorithm.to_string(), key.to_string())),
                _ => log::warn!("ignoring malformed public key {}", path.display()),
            }
        }
        Ok(keys)
    }

    fn render(&self) -> Result<String> {
        Ok(render_known_hosts(
            &self.hostkey_name,
            &self.aliases,
            &self.public_keys()?,
        ))
    }
}

impl Resource for KnownHosts {
    fn id(&self) -> ResourceId {
        ResourceId::new("KnownHosts", self.title.display().to_string())
    }

    fn description(&self) -> String {
        format!(
            "{} from {}",
            self.spec.path.display(),
            self.key_dir.display()
        )
    }

    fn lock_key(&self) -> String {
        format!("file:{}", self.spec.path.display())
    }

    /// Fails when the host keys cannot be read, so neither the preview nor
    /// the executor works from a key list that is silently empty
    fn current_state(&self) -> Result<ResourceState> {
        self.render().context("Could not read host keys")?;
        self.spec.observe()
    }

    fn desired_state(&self) -> ResourceState {
        match self.render() {
            Ok(content) => self.spec.desired(&content),
            Err(e) => {
                log::warn!("could not read host keys: {:#}", e);
                self.spec.desired(&render_known_hosts(&self.hostkey_name, &self.aliases, &[]))
            }
        }
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        let content = self.render()?;
        self.spec.converge(&content, changes)
    }
}
