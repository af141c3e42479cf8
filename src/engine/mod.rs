//! Execution engine for sshcm
//!
//! The engine orchestrates:
//! 1. Diffing - Compute current vs desired state for every resource
//! 2. Confirming - Show the diff and ask before mutating
//! 3. Executing - Converge through the declarative executor with progress

pub mod differ;
pub mod executor;

pub use executor::{RunOptions, run};
