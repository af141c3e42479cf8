//! Catalog - the set of resources and relationships for one run

use crate::error::GraphError;
use crate::graph::Graph;
use crate::resource::BoxedResource;
use crate::types::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of relationship between two resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `from` converges before `to`
    Ordering,
    /// Ordering, and a change in `from` refreshes `to`
    Notify,
}

/// A directed relationship: `from` converges before `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: ResourceId,
    pub to: ResourceId,
    pub kind: EdgeKind,
}

impl Edge {
    /// `first` converges before `second`
    pub fn before(first: ResourceId, second: ResourceId) -> Self {
        Self {
            from: first,
            to: second,
            kind: EdgeKind::Ordering,
        }
    }

    /// `dependent` converges after `dependency`
    pub fn require(dependent: ResourceId, dependency: ResourceId) -> Self {
        Self::before(dependency, dependent)
    }

    /// `source` converges before `target`, and refreshes it on change
    pub fn notify(source: ResourceId, target: ResourceId) -> Self {
        Self {
            from: source,
            to: target,
            kind: EdgeKind::Notify,
        }
    }

    /// `subscriber` converges after `source`, and refreshes on its change
    pub fn subscribe(subscriber: ResourceId, source: ResourceId) -> Self {
        Self::notify(source, subscriber)
    }
}

/// Resources and the edges between them, ready to become a [`Graph`]
#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<BoxedResource>,
    edges: Vec<Edge>,
    ids: HashSet<ResourceId>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; identities must be unique
    pub fn add(&mut self, resource: BoxedResource) -> Result<(), GraphError> {
        let id = resource.id();
        if !self.ids.insert(id.clone()) {
            return Err(GraphError::Duplicate(id));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Add a relationship (validated when the graph is built)
    pub fn relate(&mut self, edge: Edge) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub fn resources(&self) -> &[BoxedResource] {
        &self.resources
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Keep only resources matching a target, plus everything they require
    ///
    /// Target format: a kind (`service`), a full identity
    /// (`Service[sshd]`) or a fragment of a title (`sshd_config`).
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(target) = target else {
            return self;
        };

        let mut keep: HashSet<ResourceId> = self
            .resources
            .iter()
            .map(|r| r.id())
            .filter(|id| matches_target(id, target))
            .collect();

        // Pull in transitive dependencies so the selection can converge
        loop {
            let before = keep.len();
            for edge in &self.edges {
                if keep.contains(&edge.to) && !keep.contains(&edge.from) {
                    keep.insert(edge.from.clone());
                }
            }
            if keep.len() == before {
                break;
            }
        }

        let resources: Vec<BoxedResource> = self
            .resources
            .into_iter()
            .filter(|r| keep.contains(&r.id()))
            .collect();
        let edges = self
            .edges
            .into_iter()
            .filter(|e| keep.contains(&e.from) && keep.contains(&e.to))
            .collect();

        Self {
            resources,
            edges,
            ids: keep,
        }
    }

    /// Validate relationships and produce an executable graph
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        Graph::build(self.resources, &self.edges)
    }
}

/// Check if an identity matches a target string
fn matches_target(id: &ResourceId, target: &str) -> bool {
    if let Some(parsed) = ResourceId::parse(target) {
        return parsed.kind.eq_ignore_ascii_case(&id.kind) && parsed.title == id.title;
    }

    id.kind.eq_ignore_ascii_case(target)
        || id.kind.eq_ignore_ascii_case(target.trim_end_matches('s'))
        || id.title.contains(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::resource::Resource;
    use crate::types::{Change, ResourceState};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Stub(ResourceId);

    impl Resource for Stub {
        fn id(&self) -> ResourceId {
            self.0.clone()
        }

        fn current_state(&self) -> anyhow::Result<ResourceState> {
            Ok(ResourceState::new())
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::new()
        }

        fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn stub(kind: &str, title: &str) -> BoxedResource {
        Arc::new(Stub(ResourceId::new(kind, title)))
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(stub("Package", "openssh-server")).unwrap();
        catalog.add(stub("File", "/etc/ssh/sshd_config")).unwrap();
        catalog.add(stub("Service", "sshd")).unwrap();
        catalog.add(stub("Group", "ops")).unwrap();
        catalog.relate(Edge::require(
            ResourceId::new("File", "/etc/ssh/sshd_config"),
            ResourceId::new("Package", "openssh-server"),
        ));
        catalog.relate(Edge::notify(
            ResourceId::new("File", "/etc/ssh/sshd_config"),
            ResourceId::new("Service", "sshd"),
        ));
        catalog
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut catalog = Catalog::new();
        catalog.add(stub("Group", "ops")).unwrap();
        assert_eq!(
            catalog.add(stub("Group", "ops")),
            Err(GraphError::Duplicate(ResourceId::new("Group", "ops")))
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_relate_ignores_exact_duplicates() {
        let mut catalog = sample();
        let edges_before = catalog.edges().len();
        catalog.relate(Edge::notify(
            ResourceId::new("File", "/etc/ssh/sshd_config"),
            ResourceId::new("Service", "sshd"),
        ));
        assert_eq!(catalog.edges().len(), edges_before);
    }

    #[test]
    fn test_filter_by_kind_pulls_dependencies() {
        let catalog = sample().filter_by_target(Some("service"));
        let mut ids: Vec<String> = catalog.resources().iter().map(|r| r.id().to_string()).collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                "File[/etc/ssh/sshd_config]",
                "Package[openssh-server]",
                "Service[sshd]"
            ]
        );
        assert_eq!(catalog.edges().len(), 2);
    }

    #[test]
    fn test_filter_by_identity() {
        let catalog = sample().filter_by_target(Some("Group[ops]"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&ResourceId::new("Group", "ops")));
        assert!(catalog.edges().is_empty());
    }

    #[test]
    fn test_filter_none_keeps_everything() {
        let catalog = sample().filter_by_target(None);
        assert_eq!(catalog.len(), 4);
    }
}
