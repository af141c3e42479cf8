//! Diff computation for resources

use crate::error::{ApplyError, Operation};
use crate::executor::bounded;
use crate::graph::Graph;
use crate::resource::Resource;
use crate::types::{Change, ENSURE, ResourceId, ResourceState, find_change};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub resource_id: ResourceId,
    /// Human-readable description
    pub description: String,
    pub current: ResourceState,
    pub desired: ResourceState,
    /// Property changes needed to converge
    pub changes: Vec<Change>,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;
        let desired = resource.desired_state();
        let changes = desired.delta_from(&current);

        if changes.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            description: resource.description(),
            current,
            desired,
            changes,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        find_change(&self.changes, ENSURE)
            .is_some_and(|c| c.from.as_deref().is_none_or(|from| from == "absent"))
            && !self.desired.is_absent()
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.desired.is_absent()
    }
}

/// Compute diffs for every resource, in topological order
///
/// Each state query runs bounded by `step_timeout`, like a query during
/// execution. Resources whose query fails or times out are returned
/// separately.
pub fn compute_diffs(graph: &Graph, step_timeout: Duration) -> (Vec<ResourceDiff>, Vec<ApplyError>) {
    let mut diffs = Vec::new();
    let mut errors = Vec::new();

    for resource in graph.resources_in_order() {
        match bounded(resource, Operation::Query, step_timeout, ResourceDiff::from_resource) {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    (diffs, errors)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource kind
pub fn group_by_kind(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_id.kind.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::context::ApplyContext;
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Debug)]
    struct Fixed {
        id: ResourceId,
        current: ResourceState,
        desired: ResourceState,
    }

    impl Resource for Fixed {
        fn id(&self) -> ResourceId {
            self.id.clone()
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.current.get("broken").is_some() {
                anyhow::bail!("query failed");
            }
            if self.current.get("hung").is_some() {
                std::thread::sleep(Duration::from_secs(2));
            }
            Ok(self.current.clone())
        }

        fn desired_state(&self) -> ResourceState {
            self.desired.clone()
        }

        fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
            Ok(())
        }
    }

    fn fixed(kind: &str, title: &str, current: ResourceState, desired: ResourceState) -> Fixed {
        Fixed {
            id: ResourceId::new(kind, title),
            current,
            desired,
        }
    }

    fn present() -> ResourceState {
        ResourceState::new().with(ENSURE, "present")
    }

    #[test]
    fn test_diff_classification() {
        let mut catalog = Catalog::new();
        catalog
            .add(Arc::new(fixed("Group", "new", ResourceState::absent(), present())))
            .unwrap();
        catalog
            .add(Arc::new(fixed("Group", "old", present(), ResourceState::absent())))
            .unwrap();
        catalog
            .add(Arc::new(fixed(
                "File",
                "f",
                present().with("mode", "0600"),
                present().with("mode", "0644"),
            )))
            .unwrap();
        catalog
            .add(Arc::new(fixed("File", "same", present(), present())))
            .unwrap();
        catalog
            .add(Arc::new(fixed(
                "User",
                "broken",
                ResourceState::new().with("broken", "yes"),
                present(),
            )))
            .unwrap();
        let graph = catalog.into_graph().unwrap();

        let (diffs, errors) = compute_diffs(&graph, Duration::from_secs(5));
        assert_eq!(diffs.len(), 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].resource(), &ResourceId::new("User", "broken"));
        assert_eq!(errors[0].operation(), Operation::Query);

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.modifications, 1);
        assert!(summary.has_changes());

        let groups = group_by_kind(&diffs);
        assert_eq!(groups["Group"].len(), 2);
        assert_eq!(groups["File"].len(), 1);
    }

    #[test]
    fn test_hung_query_is_bounded() {
        let mut catalog = Catalog::new();
        catalog
            .add(Arc::new(fixed(
                "Package",
                "slow",
                ResourceState::new().with("hung", "yes"),
                present(),
            )))
            .unwrap();
        catalog
            .add(Arc::new(fixed("Group", "new", ResourceState::absent(), present())))
            .unwrap();
        let graph = catalog.into_graph().unwrap();

        let started = Instant::now();
        let (diffs, errors) = compute_diffs(&graph, Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(diffs.len(), 1);
        assert_eq!(
            errors,
            vec![ApplyError::Timeout {
                resource: ResourceId::new("Package", "slow"),
                operation: Operation::Query,
                timeout_ms: 50,
            }]
        );
    }
}
