//! # Declarative
//!
//! A framework for declarative resource convergence.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match it by applying
//! only the difference.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (files, packages, services)
//! - **ResourceState**: The current or desired state of a resource, as properties
//! - **Catalog**: Resources plus ordering and notify relationships
//! - **Graph**: A validated, acyclic catalog with a deterministic order
//! - **Executor**: Converges a graph resource by resource, with bounded steps
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Catalog, Edge, ExecuteOptions, ResourceId, execute_simple};
//!
//! let mut catalog = Catalog::new();
//! catalog.add(package)?;
//! catalog.add(config_file)?;
//! catalog.add(service)?;
//! catalog.relate(Edge::require(config_file_id.clone(), package_id));
//! catalog.relate(Edge::notify(config_file_id, service_id));
//!
//! let graph = catalog.into_graph()?;
//! let report = execute_simple(&graph, &ExecuteOptions::default())?;
//! assert!(report.is_success());
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`CancelToken`]: Cooperative cancellation between steps
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or signal handling.

pub mod catalog;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod report;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use catalog::{Catalog, Edge, EdgeKind};
pub use context::{ApplyContext, CancelToken, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_kind};
pub use error::{ApplyError, GraphError, Operation, SkipReason};
pub use executor::{execute, execute_simple};
pub use graph::{Graph, validate};
pub use report::{ResourceReport, RunReport};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{
    Change, ENSURE, ExecuteOptions, ExecuteSummary, ResourceId, ResourceState, ResourceStatus,
    find_change,
};
