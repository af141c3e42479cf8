//! # hostkit
//!
//! Host collaborators for configuration convergence on Linux.
//!
//! This crate provides functionality for:
//! - Querying and changing packages (apt, dnf, zypper, pacman)
//! - Controlling services (systemd)
//! - Managing users and groups (getent and shadow-utils)
//! - Generating SSH host keys (`ssh-keygen`)
//!
//! Every backend runs its tools through a [`CommandRunner`], and
//! [`MemoryHost`] implements all collaborator traits in memory for tests.
//!
//! ## Example
//!
//! ```no_run
//! use hostkit::{CommandRunner, PackageManager, SystemRunner, package};
//! use std::sync::Arc;
//!
//! let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
//! let packages = package::for_os_family("Debian", runner).expect("supported family");
//!
//! if packages.installed_version("openssh-server").expect("query").is_none() {
//!     packages.install("openssh-server", None).expect("install");
//! }
//! ```

#![warn(clippy::all)]

pub mod account;
pub mod command;
pub mod error;
pub mod keygen;
pub mod memory;
pub mod package;
pub mod service;

pub use account::{AccountManager, GroupEntry, SystemAccounts, UserAttrs, UserEntry};
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use error::{Error, ErrorCategory, Result};
pub use keygen::{KeyGenerator, SshKeygen};
pub use memory::{MemoryHost, ServiceRecord};
pub use package::{PackageEnsure, PackageManager};
pub use service::ServiceManager;
pub use service::systemd::Systemd;
