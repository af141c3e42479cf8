//! Error types for host operations.
//!
//! Errors are categorized so callers can give appropriate feedback. The
//! category is derived from the failing tool's exit code and stderr.

use thiserror::Error;

/// Categories of host errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Package, unit, user or group does not exist
    NotFound,
    /// Permission denied (usually not running as root)
    Permission,
    /// An external tool exited unsuccessfully
    CommandFailed,
    /// Operation not supported by this backend
    Unsupported,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::Permission => "Permission denied",
            Self::CommandFailed => "Command failed",
            Self::Unsupported => "Not supported",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the name exists in the configured repositories or databases",
            Self::Permission => "Run as root or with sufficient privileges",
            Self::CommandFailed => "Check the command output above for details",
            Self::Unsupported => "Use a supported platform or adjust the parameters",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during host operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The named object does not exist
    #[error("not found: {name}")]
    NotFound {
        /// Name of the missing package, unit, user or group
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// A command could not be spawned
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that could not be started
        program: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A command exited unsuccessfully
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        /// Program that failed
        program: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Standard error output
        stderr: String,
    },

    /// Output of a tool could not be parsed
    #[error("unexpected output from {program}: {message}")]
    Parse {
        /// Program whose output was malformed
        program: String,
        /// What was wrong with it
        message: String,
    },

    /// Operation not supported by this backend
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorCategory::NotFound
            }
            Error::Spawn { .. } | Error::CommandFailed { .. } => ErrorCategory::CommandFailed,
            Error::Unsupported(_) => ErrorCategory::Unsupported,
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCategory::Permission
            }
            _ => ErrorCategory::Other,
        }
    }

    /// Create an error from a failed command's output.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_command_output(program: &str, code: Option<i32>, stderr: &str, name: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("operation not permitted")
            || stderr_lower.contains("are you root")
            || stderr_lower.contains("must be root")
            || stderr_lower.contains("only root")
            || stderr_lower.contains("interactive authentication required")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("unable to locate package")
            || stderr_lower.contains("no match for argument")
            || stderr_lower.contains("not found in package names")
            || stderr_lower.contains("target not found")
            || stderr_lower.contains("could not be found")
            || stderr_lower.contains("does not exist")
        {
            return Error::NotFound {
                name: name.to_string(),
            };
        }

        Error::CommandFailed {
            program: program.to_string(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, Error>;
