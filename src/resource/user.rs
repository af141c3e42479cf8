//! User resource

use crate::schema::UserParams;
use anyhow::{Context, Result};
use declarative::{ApplyContext, Change, ENSURE, Resource, ResourceId, ResourceState, find_change};
use hostkit::{AccountManager, UserAttrs};
use std::sync::Arc;

/// A local user account
///
/// Only attributes set in the (merged) parameters are compared; anything
/// left unset is whatever the system chose.
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub params: UserParams,
    accounts: Arc<dyn AccountManager>,
}

impl User {
    pub fn new(name: &str, params: UserParams, accounts: Arc<dyn AccountManager>) -> Self {
        Self {
            name: name.to_string(),
            params,
            accounts,
        }
    }

    fn manage_home(&self) -> bool {
        self.params.managehome.unwrap_or(false)
    }

    /// Attributes for `useradd`: everything declared
    fn create_attrs(&self) -> UserAttrs {
        UserAttrs {
            uid: self.params.uid,
            group: self.params.group.clone(),
            groups: self.params.groups.as_ref().map(|g| sorted(g)),
            home: self.params.home.clone(),
            shell: self.params.shell.clone(),
            comment: self.params.comment.clone(),
            manage_home: self.manage_home(),
        }
    }

    /// Attributes for `usermod`: only what changed
    fn modify_attrs(&self, changes: &[Change]) -> UserAttrs {
        let changed = |property: &str| find_change(changes, property).is_some();
        UserAttrs {
            uid: self.params.uid.filter(|_| changed("uid")),
            group: self.params.group.clone().filter(|_| changed("group")),
            groups: self
                .params
                .groups
                .as_ref()
                .filter(|_| changed("groups"))
                .map(|g| sorted(g)),
            home: self.params.home.clone().filter(|_| changed("home")),
            shell: self.params.shell.clone().filter(|_| changed("shell")),
            comment: self.params.comment.clone().filter(|_| changed("comment")),
            manage_home: self.manage_home() && changed("home"),
        }
    }
}

fn sorted(groups: &[String]) -> Vec<String> {
    let mut groups = groups.to_vec();
    groups.sort();
    groups.dedup();
    groups
}

impl Resource for User {
    fn id(&self) -> ResourceId {
        ResourceId::new("User", &self.name)
    }

    fn lock_key(&self) -> String {
        "accounts".to_string()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Some(entry) = self.accounts.user(&self.name)? else {
            return Ok(ResourceState::absent());
        };
        let group = match self.accounts.group_by_gid(entry.gid)? {
            Some(group) => group.name,
            None => entry.gid.to_string(),
        };
        let groups = self.accounts.supplementary_groups(&self.name)?;

        Ok(ResourceState::new()
            .with(ENSURE, "present")
            .with("uid", entry.uid.to_string())
            .with("group", group)
            .with("groups", sorted(&groups).join(","))
            .with("home", entry.home)
            .with("shell", entry.shell)
            .with("comment", entry.comment))
    }

    fn desired_state(&self) -> ResourceState {
        if !self.params.presence().is_present() {
            return ResourceState::absent();
        }
        let mut state = ResourceState::new().with(ENSURE, "present");
        if let Some(uid) = self.params.uid {
            state.set("uid", uid.to_string());
        }
        if let Some(group) = &self.params.group {
            state.set("group", group);
        }
        if let Some(groups) = &self.params.groups {
            state.set("groups", sorted(groups).join(","));
        }
        if let Some(home) = &self.params.home {
            state.set("home", home);
        }
        if let Some(shell) = &self.params.shell {
            state.set("shell", shell);
        }
        if let Some(comment) = &self.params.comment {
            state.set("comment", comment);
        }
        state
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        if !self.params.presence().is_present() {
            self.accounts
                .delete_user(&self.name, self.manage_home())
                .with_context(|| format!("Could not delete user {}", self.name))?;
            return Ok(());
        }

        if find_change(changes, ENSURE).is_some() {
            self.accounts
                .create_user(&self.name, &self.create_attrs())
                .with_context(|| format!("Could not create user {}", self.name))?;
        } else {
            self.accounts
                .modify_user(&self.name, &self.modify_attrs(changes))
                .with_context(|| format!("Could not modify user {}", self.name))?;
        }
        Ok(())
    }
}
