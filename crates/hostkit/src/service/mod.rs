//! Service manager backends.

pub mod systemd;

use crate::error::Result;
use std::fmt;

/// Interface to the host's init system.
pub trait ServiceManager: Send + Sync + fmt::Debug {
    /// Whether the init system reports the service as running.
    fn is_active(&self, service: &str) -> Result<bool>;

    /// Whether a process with this exact name is running.
    ///
    /// Used for services whose status command cannot be trusted.
    fn process_running(&self, process: &str) -> Result<bool>;

    /// Whether the service starts at boot.
    fn is_enabled(&self, service: &str) -> Result<bool>;

    fn start(&self, service: &str) -> Result<()>;

    fn stop(&self, service: &str) -> Result<()>;

    fn enable(&self, service: &str) -> Result<()>;

    fn disable(&self, service: &str) -> Result<()>;

    /// Restart in one step (only for services that support it).
    fn restart(&self, service: &str) -> Result<()>;
}
