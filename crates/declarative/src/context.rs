//! Apply context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress display or
//! signal handling.

use crate::report::ResourceReport;
use crate::types::ResourceId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called once before the first resource
    fn on_run_start(&mut self, total: usize);

    /// Called when a resource leaves `Pending`
    fn on_resource_start(&mut self, id: &ResourceId);

    /// Called when a resource reaches a terminal status
    fn on_resource_complete(&mut self, report: &ResourceReport);

    /// Called after the last resource
    fn on_run_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _total: usize) {}
    fn on_resource_start(&mut self, _id: &ResourceId) {}
    fn on_resource_complete(&mut self, _report: &ResourceReport) {}
    fn on_run_complete(&mut self) {}
}

/// Cooperative cancellation flag, checked between resource steps
///
/// In-flight external calls are never interrupted; the executor stops
/// scheduling once the current step returns.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Context passed to resource apply operations
#[derive(Debug, Clone, Default)]
pub struct ApplyContext {
    /// Whether to output verbose information
    pub verbose: bool,
    /// Resources whose change triggered this call (refresh only)
    pub notified_by: Vec<ResourceId>,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            notified_by: Vec::new(),
        }
    }

    /// Create a context carrying the notification sources
    pub fn with_notifications(verbose: bool, notified_by: Vec<ResourceId>) -> Self {
        Self {
            verbose,
            notified_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
