//! Group resource

use crate::schema::GroupParams;
use anyhow::{Context, Result};
use declarative::{ApplyContext, Change, ENSURE, Resource, ResourceId, ResourceState, find_change};
use hostkit::AccountManager;
use std::sync::Arc;

/// A local group; the gid is only compared when declared
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub params: GroupParams,
    accounts: Arc<dyn AccountManager>,
}

impl Group {
    pub fn new(name: &str, params: GroupParams, accounts: Arc<dyn AccountManager>) -> Self {
        Self {
            name: name.to_string(),
            params,
            accounts,
        }
    }
}

impl Resource for Group {
    fn id(&self) -> ResourceId {
        ResourceId::new("Group", &self.name)
    }

    fn lock_key(&self) -> String {
        "accounts".to_string()
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(match self.accounts.group(&self.name)? {
            Some(group) => ResourceState::new()
                .with(ENSURE, "present")
                .with("gid", group.gid.to_string()),
            None => ResourceState::absent(),
        })
    }

    fn desired_state(&self) -> ResourceState {
        if !self.params.presence().is_present() {
            return ResourceState::absent();
        }
        let mut state = ResourceState::new().with(ENSURE, "present");
        if let Some(gid) = self.params.gid {
            state.set("gid", gid.to_string());
        }
        state
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        if !self.params.presence().is_present() {
            self.accounts
                .delete_group(&self.name)
                .with_context(|| format!("Could not delete group {}", self.name))?;
            return Ok(());
        }

        if find_change(changes, ENSURE).is_some() {
            self.accounts
                .create_group(&self.name, self.params.gid, self.params.system)
                .with_context(|| format!("Could not create group {}", self.name))?;
        } else if let Some(gid) = self.params.gid
            && find_change(changes, "gid").is_some()
        {
            self.accounts
                .modify_group(&self.name, gid)
                .with_context(|| format!("Could not change gid of {}", self.name))?;
        }
        Ok(())
    }
}
