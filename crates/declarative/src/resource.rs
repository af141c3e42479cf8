//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{Change, ResourceId, ResourceState};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (kind + title)
/// - State detection (current vs desired)
/// - State convergence (apply exactly the delta)
/// - An optional reaction to notifications (refresh)
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, Change, Resource, ResourceId, ResourceState};
///
/// #[derive(Debug)]
/// struct Marker {
///     path: std::path::PathBuf,
/// }
///
/// impl Resource for Marker {
///     fn id(&self) -> ResourceId {
///         ResourceId::new("Marker", self.path.display().to_string())
///     }
///
///     fn current_state(&self) -> anyhow::Result<ResourceState> {
///         if self.path.exists() {
///             Ok(ResourceState::new().with("ensure", "present"))
///         } else {
///             Ok(ResourceState::absent())
///         }
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::new().with("ensure", "present")
///     }
///
///     fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> anyhow::Result<()> {
///         std::fs::write(&self.path, "")?;
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identity of this resource within its catalog
    fn id(&self) -> ResourceId;

    /// Human-readable description of what this resource does
    fn description(&self) -> String {
        self.id().to_string()
    }

    /// Key serializing operations that touch the same external state
    ///
    /// Two resources with the same lock key never converge concurrently.
    fn lock_key(&self) -> String {
        self.id().to_string()
    }

    /// Detect the current state of this resource
    ///
    /// This should query the system to determine what state
    /// the resource is currently in.
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state for this resource
    ///
    /// This is typically derived from the compiled catalog.
    fn desired_state(&self) -> ResourceState;

    /// Changes needed to reach the desired state
    fn delta(&self) -> Result<Vec<Change>> {
        let current = self.current_state()?;
        Ok(self.desired_state().delta_from(&current))
    }

    /// Apply exactly the given changes
    ///
    /// Only called with a non-empty delta and never during a dry run.
    fn apply(&self, changes: &[Change], ctx: &ApplyContext) -> Result<()>;

    /// React to a notification from a changed dependency
    ///
    /// Returns `true` when an action was taken (e.g. a service restart).
    fn refresh(&self, _ctx: &ApplyContext) -> Result<bool> {
        Ok(false)
    }

    /// Whether this resource can be converged in parallel with others
    ///
    /// Override to return false for resources that must run alone.
    fn can_parallelize(&self) -> bool {
        true
    }
}

/// A shared resource handle; steps run on worker threads
pub type BoxedResource = Arc<dyn Resource>;

/// Extension trait for working with resources
pub trait ResourceExt {
    /// Check if the resource is already converged
    fn is_converged(&self) -> Result<bool>;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn is_converged(&self) -> Result<bool> {
        Ok(self.delta()?.is_empty())
    }
}
