//! Dependency graph: validated relationships and a deterministic
//! topological order

use crate::catalog::{Edge, EdgeKind};
use crate::error::GraphError;
use crate::resource::BoxedResource;
use crate::types::ResourceId;
use std::collections::{BTreeSet, HashMap};

/// Index structure shared by [`Graph`] and [`validate`]
#[derive(Debug, Clone)]
struct Topology {
    index: HashMap<ResourceId, usize>,
    /// Incoming edges: the resources each node waits for
    dependencies: Vec<Vec<usize>>,
    /// Outgoing edges with their kind
    dependents: Vec<Vec<(usize, EdgeKind)>>,
    order: Vec<usize>,
}

impl Topology {
    fn build(ids: &[ResourceId], edges: &[Edge]) -> Result<Self, GraphError> {
        let n = ids.len();
        let mut index = HashMap::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(GraphError::Duplicate(id.clone()));
            }
        }

        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<(usize, EdgeKind)>> = vec![Vec::new(); n];

        for edge in edges {
            let Some(&from) = index.get(&edge.from) else {
                return Err(GraphError::UnknownResource {
                    from: edge.to.clone(),
                    to: edge.from.clone(),
                });
            };
            let Some(&to) = index.get(&edge.to) else {
                return Err(GraphError::UnknownResource {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            };
            if from == to {
                return Err(GraphError::SelfEdge(edge.from.clone()));
            }

            // Parallel edges collapse; notify wins over plain ordering
            match dependents[from].iter_mut().find(|(target, _)| *target == to) {
                Some(existing) => {
                    if edge.kind == EdgeKind::Notify {
                        existing.1 = EdgeKind::Notify;
                    }
                }
                None => {
                    dependents[from].push((to, edge.kind));
                    dependencies[to].push(from);
                }
            }
        }

        let mut indegree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &(j, _) in &dependents[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() < n {
            let remaining: Vec<bool> = indegree.iter().map(|&d| d > 0).collect();
            let path = find_cycle(&dependencies, &remaining)
                .into_iter()
                .map(|i| ids[i].clone())
                .collect();
            return Err(GraphError::Cycle { path });
        }

        Ok(Self {
            index,
            dependencies,
            dependents,
            order,
        })
    }
}

/// Walk backwards through unresolved dependencies until a node repeats
///
/// Every unresolved node has at least one unresolved dependency, so the
/// walk always closes a loop.
fn find_cycle(dependencies: &[Vec<usize>], remaining: &[bool]) -> Vec<usize> {
    let Some(start) = remaining.iter().position(|&r| r) else {
        return Vec::new();
    };

    let mut seen: HashMap<usize, usize> = HashMap::new();
    let mut walk = Vec::new();
    let mut current = start;

    loop {
        if let Some(&pos) = seen.get(&current) {
            let mut cycle = walk[pos..].to_vec();
            cycle.reverse();
            if let Some(min_pos) = cycle
                .iter()
                .enumerate()
                .min_by_key(|(_, node)| **node)
                .map(|(pos, _)| pos)
            {
                cycle.rotate_left(min_pos);
            }
            return cycle;
        }
        seen.insert(current, walk.len());
        walk.push(current);

        match dependencies[current].iter().copied().find(|&d| remaining[d]) {
            Some(next) => current = next,
            None => return walk,
        }
    }
}

/// Check identities and relationships without building resources
///
/// Returns the identities in topological order.
pub fn validate(ids: &[ResourceId], edges: &[Edge]) -> Result<Vec<ResourceId>, GraphError> {
    let topology = Topology::build(ids, edges)?;
    Ok(topology.order.iter().map(|&i| ids[i].clone()).collect())
}

/// A validated, acyclic resource graph
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<BoxedResource>,
    ids: Vec<ResourceId>,
    topology: Topology,
}

impl Graph {
    /// Build a graph, rejecting duplicates, dangling edges and cycles
    pub fn build(nodes: Vec<BoxedResource>, edges: &[Edge]) -> Result<Self, GraphError> {
        let ids: Vec<ResourceId> = nodes.iter().map(|r| r.id()).collect();
        let topology = Topology::build(&ids, edges)?;
        Ok(Self {
            nodes,
            ids,
            topology,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node indices in topological order
    pub fn order(&self) -> &[usize] {
        &self.topology.order
    }

    pub fn resource(&self, index: usize) -> &BoxedResource {
        &self.nodes[index]
    }

    pub fn id(&self, index: usize) -> &ResourceId {
        &self.ids[index]
    }

    pub fn index_of(&self, id: &ResourceId) -> Option<usize> {
        self.topology.index.get(id).copied()
    }

    /// Direct dependencies of a node
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.topology.dependencies[index]
    }

    /// Direct dependents of a node with the edge kind
    pub fn dependents(&self, index: usize) -> &[(usize, EdgeKind)] {
        &self.topology.dependents[index]
    }

    /// Identities in topological order
    pub fn ordered_ids(&self) -> Vec<ResourceId> {
        self.order().iter().map(|&i| self.ids[i].clone()).collect()
    }

    /// Resources in topological order
    pub fn resources_in_order(&self) -> impl Iterator<Item = &BoxedResource> {
        self.order().iter().map(|&i| &self.nodes[i])
    }

    /// Whether `dependent` transitively waits for `dependency`
    pub fn depends_on(&self, dependent: &ResourceId, dependency: &ResourceId) -> bool {
        let (Some(start), Some(target)) = (self.index_of(dependent), self.index_of(dependency))
        else {
            return false;
        };

        let mut stack = vec![start];
        let mut visited = vec![false; self.len()];
        while let Some(node) = stack.pop() {
            for &dep in self.dependencies(node) {
                if dep == target {
                    return true;
                }
                if !visited[dep] {
                    visited[dep] = true;
                    stack.push(dep);
                }
            }
        }
        false
    }
}
