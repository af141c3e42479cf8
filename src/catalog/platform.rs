//! Per OS family defaults.

use super::error::CompileError;
use serde::Serialize;
use std::path::PathBuf;

/// Package, service and path names for one OS family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub family: String,
    pub package: String,
    pub service: String,
    pub config_dir: PathBuf,
    /// Path of the sftp subsystem binary
    pub sftp_server: String,
}

impl Platform {
    /// Look up the platform table
    pub fn for_family(family: &str) -> Result<Self, CompileError> {
        let (package, service, sftp_server) = match family {
            "Debian" => ("openssh-server", "ssh", "/usr/lib/openssh/sftp-server"),
            "RedHat" => ("openssh-server", "sshd", "/usr/libexec/openssh/sftp-server"),
            "Suse" => ("openssh", "sshd", "/usr/lib/ssh/sftp-server"),
            "Archlinux" => ("openssh", "sshd", "/usr/lib/ssh/sftp-server"),
            other => return Err(CompileError::UnsupportedPlatform(other.to_string())),
        };

        Ok(Self {
            family: family.to_string(),
            package: package.to_string(),
            service: service.to_string(),
            config_dir: PathBuf::from("/etc/ssh"),
            sftp_server: sftp_server.to_string(),
        })
    }

    pub fn sshd_config(&self) -> PathBuf {
        self.config_dir.join("sshd_config")
    }

    pub fn known_hosts(&self) -> PathBuf {
        self.config_dir.join("ssh_known_hosts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(Platform::for_family("Debian").unwrap().service, "ssh");
        assert_eq!(Platform::for_family("RedHat").unwrap().service, "sshd");
        assert_eq!(Platform::for_family("Suse").unwrap().package, "openssh");
        assert_eq!(
            Platform::for_family("Archlinux").unwrap().sshd_config(),
            PathBuf::from("/etc/ssh/sshd_config")
        );
    }

    #[test]
    fn test_unsupported_family() {
        let err = Platform::for_family("Solaris").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedPlatform(ref f) if f == "Solaris"));
    }
}
