//! Build decision policy.
//!
//! Pure function from an aggregated change set to a build plan. No actor
//! machinery, no side effects.

use std::path::PathBuf;

use super::changes::ChangeSet;
use super::classify::{FileKind, classify};
use crate::config::ProjectConfig;

/// What a build cycle should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildPlan {
    /// Recompile the entire project, bypassing the live service.
    Full,
    /// Ask the live compiler service to recompile exactly these files.
    Incremental(Vec<PathBuf>),
}

/// Decide full vs incremental for one change set.
///
/// Adding or removing a typed-source file can change module resolution in
/// ways an incremental compiler cannot safely patch, so any structural
/// typed-source change forces a full rebuild. Content-only typed-source
/// edits, and all markup/template changes, stay incremental; the file list
/// is the union of every bucket in added, modified, removed order.
pub fn decide(changes: &ChangeSet, config: &ProjectConfig) -> BuildPlan {
    let structural = changes
        .added
        .iter()
        .chain(&changes.removed)
        .any(|p| classify(p, config) == FileKind::TypedSource);

    if structural {
        BuildPlan::Full
    } else {
        BuildPlan::Incremental(changes.union())
    }
}
