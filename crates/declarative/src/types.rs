//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Property every resource uses to express presence
pub const ENSURE: &str = "ensure";

/// Identity of a resource within a catalog: `(kind, title)`
///
/// Displays as `Kind[title]`, e.g. `Service[sshd]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: String,
    pub title: String,
}

impl ResourceId {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
        }
    }

    /// Parse the `Kind[title]` form
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, rest) = s.split_once('[')?;
        let title = rest.strip_suffix(']')?;
        if kind.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self::new(kind, title))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.title)
    }
}

/// Current or desired state of a resource, as an ordered property map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    properties: BTreeMap<String, String>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a resource that does not exist
    pub fn absent() -> Self {
        Self::new().with(ENSURE, "absent")
    }

    /// Builder-style property setter
    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(property.into(), value.into());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    pub fn ensure(&self) -> Option<&str> {
        self.get(ENSURE)
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        self.ensure() == Some("absent")
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compute the changes needed to move `current` to `self`
    ///
    /// Only properties declared in the desired state are compared. When both
    /// sides are absent nothing else matters.
    pub fn delta_from(&self, current: &ResourceState) -> Vec<Change> {
        if self.is_absent() && current.is_absent() {
            return Vec::new();
        }

        if self.is_absent() {
            return vec![Change::new(ENSURE, current.ensure(), "absent")];
        }

        self.properties
            .iter()
            .filter(|(property, value)| current.get(property) != Some(value.as_str()))
            .map(|(property, value)| Change::new(property, current.get(property), value))
            .collect()
    }
}

/// A single property change: prior value to new value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub property: String,
    pub from: Option<String>,
    pub to: String,
}

impl Change {
    pub fn new(property: impl Into<String>, from: Option<&str>, to: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            from: from.map(str::to_string),
            to: to.into(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.property,
            self.from.as_deref().unwrap_or("<unset>"),
            self.to
        )
    }
}

/// Find a change by property name
pub fn find_change<'a>(changes: &'a [Change], property: &str) -> Option<&'a Change> {
    changes.iter().find(|c| c.property == property)
}

/// Per-resource convergence state
///
/// `Pending → Checked → (NoChange | Applying → Applied | Failed)`, with
/// `Skipped` for resources never checked (failed dependency, cancellation)
/// and for dry-run deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Pending,
    Checked,
    NoChange,
    Applying,
    Applied,
    Failed,
    Skipped,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NoChange | Self::Applied | Self::Failed | Self::Skipped
        )
    }

    /// Terminal and converged (dependents may proceed)
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::NoChange | Self::Applied)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoChange => "○",
            Self::Applied => "✓",
            Self::Failed => "✗",
            Self::Skipped => "⊘",
            Self::Pending | Self::Checked | Self::Applying => "…",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Checked => "checked",
            Self::NoChange => "unchanged",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub applied: usize,
    pub no_change: usize,
    pub failed: usize,
    pub skipped: usize,
    pub refreshed: usize,
    /// Property changes made (or, in a dry run, that would be made)
    pub changes: usize,
}

impl ExecuteSummary {
    /// Total number of property changes
    pub fn total_changes(&self) -> usize {
        self.changes
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.applied + self.no_change + self.failed + self.skipped
    }

    /// Add a resource outcome to the summary
    pub fn add_status(&mut self, status: ResourceStatus) {
        match status {
            ResourceStatus::Applied => self.applied += 1,
            ResourceStatus::NoChange => self.no_change += 1,
            ResourceStatus::Failed => self.failed += 1,
            ResourceStatus::Skipped => self.skipped += 1,
            ResourceStatus::Pending | ResourceStatus::Checked | ResourceStatus::Applying => {}
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just compute what would happen
    pub dry_run: bool,
    /// Resources converged concurrently per wave (1 = sequential)
    pub jobs: usize,
    /// Bound on every external query, apply and refresh call
    pub step_timeout: Duration,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 1,
            step_timeout: Duration::from_secs(300),
            verbose: false,
        }
    }
}
