//! Host key resource - one key pair per configured type

use crate::schema::KeyType;
use anyhow::{Context, Result};
use declarative::{ApplyContext, Change, Resource, ResourceId, ResourceState};
use hostkit::KeyGenerator;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Host key pairs in a directory, named `ssh_host_<type>_key[.pub]`
///
/// A pair counts as present only when both halves exist. Existing keys are
/// never regenerated.
#[derive(Debug, Clone)]
pub struct Hostkey {
    /// Host name the keys are issued for (the key comment)
    pub name: String,
    pub dir: PathBuf,
    pub types: Vec<KeyType>,
    keygen: Arc<dyn KeyGenerator>,
}

impl Hostkey {
    pub fn new(name: &str, dir: PathBuf, types: Vec<KeyType>, keygen: Arc<dyn KeyGenerator>) -> Self {
        Self {
            name: name.to_string(),
            dir,
            types,
            keygen,
        }
    }

    fn private_key(&self, key_type: KeyType) -> PathBuf {
        self.dir.join(key_type.file_name())
    }

    fn generate(&self, key_type: KeyType) -> Result<()> {
        let private = self.private_key(key_type);
        let public = public_key(&private);
        // A lone half would make ssh-keygen prompt
        for stale in [&private, &public] {
            if stale.exists() {
                fs::remove_file(stale)
                    .with_context(|| format!("Could not remove {}", stale.display()))?;
            }
        }
        self.keygen
            .generate(key_type.as_str(), &private, &self.name)
            .with_context(|| format!("Could not generate {} host key", key_type))?;
        Ok(())
    }
}

fn public_key(private: &Path) -> PathBuf {
    let mut public = private.as_os_str().to_owned();
    public.push(".pub");
    PathBuf::from(public)
}

impl Resource for Hostkey {
    fn id(&self) -> ResourceId {
        ResourceId::new("Hostkey", &self.name)
    }

    fn description(&self) -> String {
        let types: Vec<&str> = self.types.iter().map(KeyType::as_str).collect();
        format!("{} keys in {}", types.join(", "), self.dir.display())
    }

    fn lock_key(&self) -> String {
        format!("hostkey:{}", self.dir.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let mut state = ResourceState::new();
        for key_type in &self.types {
            let private = self.private_key(*key_type);
            let present = private.is_file() && public_key(&private).is_file();
            state.set(key_type.as_str(), if present { "present" } else { "absent" });
        }
        Ok(state)
    }

    fn desired_state(&self) -> ResourceState {
        let mut state = ResourceState::new();
        for key_type in &self.types {
            state.set(key_type.as_str(), "present");
        }
        state
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Could not create {}", self.dir.display()))?;
        for key_type in &self.types {
            if changes.iter().any(|c| c.property == key_type.as_str()) {
                self.generate(*key_type)?;
            }
        }
        Ok(())
    }
}
