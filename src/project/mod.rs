//! Per-project build domain: classification, change aggregation, directory
//! snapshots, and the build decision policy.
//!
//! Everything here is owned by a single project's orchestrator task; nothing
//! is shared across projects.

pub mod changes;
pub mod classify;
pub mod decision;
pub mod state;

pub use changes::{ChangeAggregator, ChangeKind, ChangeSet};
pub use classify::{FileKind, classify};
pub use decision::{BuildPlan, decide};
pub use state::DirectoryState;
