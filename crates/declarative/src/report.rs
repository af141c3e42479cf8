//! Per-resource outcomes of a convergence run

use crate::error::{ApplyError, SkipReason};
use crate::types::{Change, ExecuteSummary, ResourceId, ResourceStatus};
use serde::{Deserialize, Serialize};

/// What happened to one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub id: ResourceId,
    pub status: ResourceStatus,
    /// Every status the resource passed through, in order
    pub history: Vec<ResourceStatus>,
    /// Applied changes (or, for a dry run, pending ones)
    pub changes: Vec<Change>,
    /// Resources whose change notified this one
    pub notified_by: Vec<ResourceId>,
    /// Whether a refresh action ran
    pub refreshed: bool,
    pub error: Option<ApplyError>,
    pub skipped: Option<SkipReason>,
    /// Scheduling wave (one resource per wave when sequential)
    pub wave: usize,
    pub duration_ms: u64,
}

impl ResourceReport {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            status: ResourceStatus::Pending,
            history: vec![ResourceStatus::Pending],
            changes: Vec::new(),
            notified_by: Vec::new(),
            refreshed: false,
            error: None,
            skipped: None,
            wave: 0,
            duration_ms: 0,
        }
    }

    /// Record a status transition
    pub fn transition(&mut self, status: ResourceStatus) {
        self.status = status;
        self.history.push(status);
    }

    pub fn skip(mut self, reason: SkipReason) -> Self {
        self.transition(ResourceStatus::Skipped);
        self.skipped = Some(reason);
        self
    }

    pub fn fail(&mut self, error: ApplyError) {
        self.transition(ResourceStatus::Failed);
        self.error = Some(error);
    }

    /// Skipped because something upstream failed or was blocked
    pub fn is_blocked(&self) -> bool {
        self.status == ResourceStatus::Failed
            || matches!(self.skipped, Some(SkipReason::FailedDependency { .. }))
    }
}

/// Outcome of a whole run, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub resources: Vec<ResourceReport>,
    pub dry_run: bool,
    pub cancelled: bool,
}

impl RunReport {
    pub fn get(&self, id: &ResourceId) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// Completion position of a resource
    pub fn position(&self, id: &ResourceId) -> Option<usize> {
        self.resources.iter().position(|r| &r.id == id)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources
            .iter()
            .filter(|r| r.status == ResourceStatus::Failed)
    }

    /// Resources with at least one change
    pub fn changed(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|r| !r.changes.is_empty())
    }

    pub fn summary(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for report in &self.resources {
            summary.add_status(report.status);
            summary.changes += report.changes.len();
            if report.refreshed {
                summary.refreshed += 1;
            }
        }
        summary
    }

    /// No resource ended `Failed`
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}
