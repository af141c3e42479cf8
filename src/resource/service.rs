//! Service resource - run state and boot enablement of a unit

use anyhow::Result;
use declarative::{ApplyContext, Change, ENSURE, Resource, ResourceId, ResourceState, find_change};
use hostkit::ServiceManager;
use std::sync::Arc;

/// A service unit
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub running: bool,
    pub enabled: bool,
    /// The init system can restart the unit in one step
    pub hasrestart: bool,
    /// The init system reports status; otherwise the process table is checked
    pub hasstatus: bool,
    pub services: Arc<dyn ServiceManager>,
}

impl Service {
    fn is_running(&self) -> Result<bool> {
        let running = if self.hasstatus {
            self.services.is_active(&self.name)?
        } else {
            self.services.process_running(&self.name)?
        };
        Ok(running)
    }
}

fn run_state(running: bool) -> &'static str {
    if running { "running" } else { "stopped" }
}

impl Resource for Service {
    fn id(&self) -> ResourceId {
        ResourceId::new("Service", &self.name)
    }

    fn description(&self) -> String {
        format!(
            "{} ({}, {})",
            self.name,
            run_state(self.running),
            if self.enabled { "enabled" } else { "disabled" }
        )
    }

    fn lock_key(&self) -> String {
        format!("service:{}", self.name)
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(ResourceState::new()
            .with(ENSURE, run_state(self.is_running()?))
            .with("enable", self.services.is_enabled(&self.name)?.to_string()))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::new()
            .with(ENSURE, run_state(self.running))
            .with("enable", self.enabled.to_string())
    }

    fn apply(&self, changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
        if find_change(changes, "enable").is_some() {
            if self.enabled {
                self.services.enable(&self.name)?;
            } else {
                self.services.disable(&self.name)?;
            }
        }
        if find_change(changes, ENSURE).is_some() {
            if self.running {
                self.services.start(&self.name)?;
            } else {
                self.services.stop(&self.name)?;
            }
        }
        Ok(())
    }

    fn refresh(&self, _ctx: &ApplyContext) -> Result<bool> {
        if !self.running {
            log::debug!("{} is meant to be stopped, ignoring refresh", self.name);
            return Ok(false);
        }
        if self.hasrestart {
            self.services.restart(&self.name)?;
        } else {
            self.services.stop(&self.name)?;
            self.services.start(&self.name)?;
        }
        log::info!("restarted {}", self.name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceExt;
    use hostkit::MemoryHost;

    fn service(host: &Arc<MemoryHost>, running: bool, enabled: bool) -> Service {
        Service {
            name: "ssh".to_string(),
            running,
            enabled,
            hasrestart: true,
            hasstatus: true,
            services: host.clone(),
        }
    }

    #[test]
    fn test_start_and_enable() {
        let host = Arc::new(MemoryHost::new().with_service("ssh", false, false));
        let resource = service(&host, true, true);

        let changes = resource.delta().unwrap();
        assert_eq!(
            changes,
            vec![
                Change::new("enable", Some("false"), "true"),
                Change::new(ENSURE, Some("stopped"), "running"),
            ]
        );
        resource.apply(&changes, &ApplyContext::default()).unwrap();
        assert!(resource.is_converged().unwrap());
        assert_eq!(host.calls(), vec!["enable ssh", "start ssh"]);
    }

    #[test]
    fn test_stop_only_what_differs() {
        let host = Arc::new(MemoryHost::new().with_service("ssh", true, true));
        let resource = service(&host, false, true);
        let changes = resource.delta().unwrap();
        resource.apply(&changes, &ApplyContext::default()).unwrap();
        assert_eq!(host.calls(), vec!["stop ssh"]);
        assert!(!host.service_record("ssh").unwrap().active);
    }

    #[test]
    fn test_refresh_restarts_running_service() {
        let host = Arc::new(MemoryHost::new().with_service("ssh", true, true));
        let resource = service(&host, true, true);
        assert!(resource.refresh(&ApplyContext::default()).unwrap());
        assert_eq!(host.service_record("ssh").unwrap().restarts, 1);
    }

    #[test]
    fn test_refresh_without_restart_command() {
        let host = Arc::new(MemoryHost::new().with_service("ssh", true, true));
        let mut resource = service(&host, true, true);
        resource.hasrestart = false;
        assert!(resource.refresh(&ApplyContext::default()).unwrap());
        assert_eq!(host.calls(), vec!["stop ssh", "start ssh"]);
    }

    #[test]
    fn test_refresh_ignored_when_stopped() {
        let host = Arc::new(MemoryHost::new().with_service("ssh", false, true));
        let resource = service(&host, false, true);
        assert!(!resource.refresh(&ApplyContext::default()).unwrap());
        assert!(host.calls().is_empty());
    }
}
