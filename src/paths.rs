//! Centralized path resolution for sshcm
//!
//! # Environment Variables
//!
//! - `SSHCM_CONFIG_DIR` - Override the parameter directory (`site.toml`, `nodes/`)
//! - `SSHCM_STATE_DIR` - Override the directory holding `last_run.json`
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SSHCM_CONFIG_DIR` environment variable
//! 2. Existing `/etc/sshcm`
//! 3. `XDG_CONFIG_HOME/sshcm` (if set)
//! 4. `~/.config/sshcm`
//!
//! For state_dir():
//! 1. `SSHCM_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/sshcm` (if set)
//! 3. `/var/lib/sshcm` when running as root
//! 4. `~/.local/state/sshcm`

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SSHCM_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "SSHCM_STATE_DIR";

/// System-wide parameter directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/sshcm";

/// System-wide state directory, used when running as root
pub const SYSTEM_STATE_DIR: &str = "/var/lib/sshcm";

/// Get the sshcm config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    let system = PathBuf::from(SYSTEM_CONFIG_DIR);
    if system.is_dir() {
        log::debug!("Using system config dir: {}", system.display());
        return Ok(system);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("sshcm");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("sshcm");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the sshcm state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("sshcm");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    if is_root() {
        log::debug!("Using system state dir: {}", SYSTEM_STATE_DIR);
        return Ok(PathBuf::from(SYSTEM_STATE_DIR));
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("sshcm");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Whether the process runs with effective uid 0
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Re-anchor an absolute managed path under an alternate root.
///
/// `under_root("/srv/stage", "/etc/ssh/sshd_config")` is
/// `/srv/stage/etc/ssh/sshd_config`; without a root the path is unchanged.
pub fn under_root(root: Option<&Path>, path: &Path) -> PathBuf {
    let Some(root) = root else {
        return path.to_path_buf();
    };
    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/config/path", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let expected = home.join("dotfiles").join("sshcm-tilde-test");
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/sshcm-tilde-test", || {
            let result = config_dir().unwrap();
            assert_eq!(result, expected);
        });
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = state_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/state/path"));
        });
    }

    #[test]
    fn test_xdg_state_home() {
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                let result = state_dir().unwrap();
                assert_eq!(result, PathBuf::from("/tmp/xdg-state-test/sshcm"));
            });
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }

    #[test]
    fn test_under_root() {
        let managed = Path::new("/etc/ssh/sshd_config");
        assert_eq!(under_root(None, managed), PathBuf::from("/etc/ssh/sshd_config"));
        assert_eq!(
            under_root(Some(Path::new("/srv/stage")), managed),
            PathBuf::from("/srv/stage/etc/ssh/sshd_config")
        );
    }
}
