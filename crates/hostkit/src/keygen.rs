//! Host key generation.
//!
//! Keys are always produced by the platform's `ssh-keygen`; this module
//! only decides where and with which type.

use crate::command::CommandRunner;
use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Something that can create an SSH key pair.
pub trait KeyGenerator: Send + Sync + fmt::Debug {
    /// Write a private key at `path` and its public half at `path.pub`.
    fn generate(&self, key_type: &str, path: &Path, comment: &str) -> Result<()>;
}

/// `ssh-keygen` backend.
#[derive(Debug, Clone)]
pub struct SshKeygen {
    runner: Arc<dyn CommandRunner>,
}

impl SshKeygen {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl KeyGenerator for SshKeygen {
    fn generate(&self, key_type: &str, path: &Path, comment: &str) -> Result<()> {
        let path = path.to_string_lossy();
        self.runner.run_checked(
            "ssh-keygen",
            &["-q", "-t", key_type, "-N", "", "-C", comment, "-f", &path],
            &path,
        )?;
        log::info!("generated {} host key {}", key_type, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedRunner;

    #[test]
    fn test_keygen_arguments() {
        let runner = Arc::new(ScriptedRunner::new());
        let keygen = SshKeygen::new(runner.clone());
        keygen
            .generate("ed25519", Path::new("/etc/ssh/ssh_host_ed25519_key"), "host.example.com")
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec!["ssh-keygen -q -t ed25519 -N  -C host.example.com -f /etc/ssh/ssh_host_ed25519_key"]
        );
    }
}
