//! systemd backend using `systemctl`.

use super::ServiceManager;
use crate::command::CommandRunner;
use crate::error::Result;
use std::sync::Arc;

/// systemctl backend.
#[derive(Debug, Clone)]
pub struct Systemd {
    runner: Arc<dyn CommandRunner>,
}

impl Systemd {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn systemctl(&self, verb: &str, service: &str) -> Result<()> {
        self.runner.run_checked("systemctl", &[verb, service], service)?;
        Ok(())
    }

    /// Exit-code queries: 0 means yes, anything else means no
    fn query(&self, verb: &str, service: &str) -> Result<bool> {
        let output = self.runner.run("systemctl", &[verb, "--quiet", service])?;
        Ok(output.success())
    }
}

impl ServiceManager for Systemd {
    fn is_active(&self, service: &str) -> Result<bool> {
        self.query("is-active", service)
    }

    fn process_running(&self, process: &str) -> Result<bool> {
        Ok(self.runner.run("pgrep", &["-x", process])?.success())
    }

    fn is_enabled(&self, service: &str) -> Result<bool> {
        self.query("is-enabled", service)
    }

    fn start(&self, service: &str) -> Result<()> {
        self.systemctl("start", service)
    }

    fn stop(&self, service: &str) -> Result<()> {
        self.systemctl("stop", service)
    }

    fn enable(&self, service: &str) -> Result<()> {
        self.systemctl("enable", service)
    }

    fn disable(&self, service: &str) -> Result<()> {
        self.systemctl("disable", service)
    }

    fn restart(&self, service: &str) -> Result<()> {
        self.systemctl("restart", service)
    }
}
