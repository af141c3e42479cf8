//! Package resource

use anyhow::Result;
use declarative::{ApplyContext, Change, ENSURE, Resource, ResourceId, ResourceState, find_change};
use hostkit::{PackageEnsure, PackageManager};
use std::sync::Arc;

/// An OS package.
///
/// The `ensure` property carries the comparison: `present`/`absent`, an
/// exact version, or `latest` when the installed version is the
/// repository candidate.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub ensure: PackageEnsure,
    packages: Arc<dyn PackageManager>,
}

impl Package {
    pub fn new(name: &str, ensure: PackageEnsure, packages: Arc<dyn PackageManager>) -> Self {
        Self {
            name: name.to_string(),
            ensure,
            packages,
        }
    }
}

impl Resource for Package {
    fn id(&self) -> ResourceId {
        ResourceId::new("Package", &self.name)
    }

    fn description(&self) -> String {
        format!("{} package {} ({})", self.packages.name(), self.name, self.ensure)
    }

    fn lock_key(&self) -> String {
        format!("package:{}", self.packages.name())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(installed) = self.packages.installed_version(&self.name)? else {
            return Ok(ResourceState::absent());
        };

        let ensure = match &self.ensure {
            PackageEnsure::Present | PackageEnsure::Absent => "present".to_string(),
            PackageEnsure::Version(_) => installed.clone(),
            PackageEnsure::Latest => {
                match self.packages.candidate_version(&self.name)? {
                    Some(candidate) if candidate == installed => "latest".to_string(),
                    _ => installed.clone(),
                }
            }
        };
        Ok(ResourceState::new()
            .with(ENSURE, ensure)
            .with("version", installed))
    }

    fn desired_state(&self) -> ResourceState {
        match &self.ensure {
            PackageEnsure::Absent => ResourceState::absent(),
            other => ResourceState::new().with(ENSURE, other.to_string()),
        }
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        if find_change(changes, ENSURE).is_none() {
            return Ok(());
        }
        match &self.ensure {
            PackageEnsure::Absent => self.packages.remove(&self.name)?,
            PackageEnsure::Present | PackageEnsure::Latest => {
                self.packages.install(&self.name, None)?;
            }
            PackageEnsure::Version(version) => {
                self.packages.install(&self.name, Some(version))?;
            }
        }
        Ok(())
    }

    fn can_parallelize(&self) -> bool {
        false
    }
}
