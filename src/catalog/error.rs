//! Compilation errors. Every variant is fatal and raised before any change
//! is made to the host.

use declarative::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The OS family has no platform entry
    #[error("unsupported platform: OS family '{0}' (supported: Debian, RedHat, Suse, Archlinux)")]
    UnsupportedPlatform(String),

    /// Two parameters cannot be used together
    #[error("conflicting parameters: {0}")]
    Conflict(String),

    /// A parameter value is well-formed but not acceptable
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required key has no value in any layer
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    /// A parameter could not be parsed into its expected type
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The resource relationships are not a DAG
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The external user source could not be read
    #[error("user source {origin}: {message}")]
    UserSource { origin: String, message: String },
}
