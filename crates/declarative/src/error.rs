//! Error types for graph construction and convergence

use crate::types::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while building the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two resources share the same identity
    #[error("duplicate declaration: {0} is already declared")]
    Duplicate(ResourceId),

    /// An edge references a resource that is not in the catalog
    #[error("{from} references unknown resource {to}")]
    UnknownResource { from: ResourceId, to: ResourceId },

    /// A resource declared a relationship with itself
    #[error("{0} cannot depend on itself")]
    SelfEdge(ResourceId),

    /// The relationships form a cycle
    #[error("dependency cycle: {}", format_cycle(.path))]
    Cycle { path: Vec<ResourceId> },
}

fn format_cycle(path: &[ResourceId]) -> String {
    let mut names: Vec<String> = path.iter().map(ToString::to_string).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" => ")
}

/// The external call a resource was making when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Query,
    Apply,
    Refresh,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Apply => "apply",
            Self::Refresh => "refresh",
        })
    }
}

/// Failure of a single resource, localized to that resource
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApplyError {
    /// The external call returned an error
    #[error("{resource}: {operation} failed: {cause}")]
    Operation {
        resource: ResourceId,
        operation: Operation,
        cause: String,
    },

    /// The external call did not finish within the step timeout
    #[error("{resource}: {operation} timed out after {timeout_ms}ms")]
    Timeout {
        resource: ResourceId,
        operation: Operation,
        timeout_ms: u64,
    },
}

impl ApplyError {
    pub fn resource(&self) -> &ResourceId {
        match self {
            Self::Operation { resource, .. } | Self::Timeout { resource, .. } => resource,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Operation { operation, .. } | Self::Timeout { operation, .. } => *operation,
        }
    }
}

/// Why a resource was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Dry run: the delta was computed but not applied
    DryRun,
    /// A dependency failed (directly or transitively)
    FailedDependency { dependency: ResourceId },
    /// The run was cancelled before this resource started
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry run"),
            Self::FailedDependency { dependency } => {
                write!(f, "dependency {} failed", dependency)
            }
            Self::Cancelled => f.write_str("run cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_closes_loop() {
        let err = GraphError::Cycle {
            path: vec![ResourceId::new("A", "1"), ResourceId::new("B", "2")],
        };
        assert_eq!(err.to_string(), "dependency cycle: A[1] => B[2] => A[1]");
    }

    #[test]
    fn test_apply_error_context() {
        let err = ApplyError::Operation {
            resource: ResourceId::new("Package", "openssh-server"),
            operation: Operation::Apply,
            cause: "apt-get exited with 100".into(),
        };
        let display = err.to_string();
        assert!(display.contains("Package[openssh-server]"));
        assert!(display.contains("apply failed"));
        assert!(display.contains("exited with 100"));
        assert_eq!(err.operation(), Operation::Apply);
    }

    #[test]
    fn test_timeout_display() {
        let err = ApplyError::Timeout {
            resource: ResourceId::new("Service", "sshd"),
            operation: Operation::Refresh,
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "Service[sshd]: refresh timed out after 5000ms");
    }
}
