//! Directory snapshots.
//!
//! An in-memory map of a project's relevant files used to answer "did this
//! path exist before the burst" and to compute a diff against the live
//! filesystem when a build is requested without any recorded events.
//!
//! Identity is `{mtime, len}`: both files in a compile flow are stat-cheap,
//! and a content edit that changes neither is not a change the compiler can
//! observe either.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use super::changes::ChangeSet;
use super::classify::{FileKind, classify};
use crate::config::ProjectConfig;
use crate::utils::path::normalize_path;

/// Last-seen identity of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    mtime: Option<SystemTime>,
    len: u64,
}

impl Signature {
    /// Read the current signature, `None` if the file is gone or unreadable.
    pub fn read(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(Self {
            mtime: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Snapshot record for one tracked file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub kind: FileKind,
    pub signature: Signature,
}

/// Snapshot of one project's relevant files.
pub struct DirectoryState {
    files: FxHashMap<PathBuf, FileRecord>,
}

impl DirectoryState {
    /// Scan the project's source and template trees.
    ///
    /// An unreadable source root is fatal; a missing template root just
    /// yields no template records (the tree may not exist yet).
    pub fn scan(config: &ProjectConfig) -> Result<Self> {
        let mut files = FxHashMap::default();
        scan_root(config.src_dir(), config, &mut files)
            .with_context(|| format!("failed to scan `{}`", config.src_dir().display()))?;
        if config.template_dir().is_dir() {
            scan_root(config.template_dir(), config, &mut files)
                .with_context(|| format!("failed to scan `{}`", config.template_dir().display()))?;
        }
        Ok(Self { files })
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Tracked file counts: (typed, markup, template).
    pub fn summary(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for record in self.files.values() {
            match record.kind {
                FileKind::TypedSource => counts.0 += 1,
                FileKind::MarkupSource => counts.1 += 1,
                FileKind::TemplateAsset => counts.2 += 1,
                FileKind::Irrelevant => {}
            }
        }
        counts
    }

    /// Diff the snapshot against the live filesystem.
    ///
    /// Used when a build cycle runs without any recorded watcher events
    /// (externally requested builds).
    pub fn check_changes(&self, config: &ProjectConfig) -> Result<ChangeSet> {
        let live = Self::scan(config)?;
        let mut changes = ChangeSet::default();

        for (path, record) in &live.files {
            match self.files.get(path) {
                None => changes.added.push(path.clone()),
                Some(old) if old.signature != record.signature => {
                    changes.modified.push(path.clone());
                }
                Some(_) => {}
            }
        }
        for path in self.files.keys() {
            if !live.files.contains_key(path) {
                changes.removed.push(path.clone());
            }
        }
        Ok(changes)
    }

    /// Patch the snapshot from a consumed change set: re-stat added and
    /// modified paths, drop removed ones. Cheaper than a rescan and
    /// observably equivalent for paths the watcher reported.
    pub fn apply(&mut self, changes: &ChangeSet, config: &ProjectConfig) {
        for path in changes.added.iter().chain(&changes.modified) {
            let kind = classify(path, config);
            if kind == FileKind::Irrelevant {
                continue;
            }
            match Signature::read(path) {
                Some(signature) => {
                    self.files
                        .insert(path.clone(), FileRecord { kind, signature });
                }
                // reported changed but already gone again
                None => {
                    self.files.remove(path);
                }
            }
        }
        for path in &changes.removed {
            self.files.remove(path);
        }
    }

    /// Replace the snapshot with a fresh scan (after a full rebuild).
    pub fn rescan(&mut self, config: &ProjectConfig) -> Result<()> {
        *self = Self::scan(config)?;
        Ok(())
    }
}

/// Walk one root, recording every relevant file.
fn scan_root(
    root: &Path,
    config: &ProjectConfig,
    files: &mut FxHashMap<PathBuf, FileRecord>,
) -> Result<()> {
    // Surface root-level IO errors (missing/unreadable directory) instead of
    // silently producing an empty snapshot.
    std::fs::read_dir(root)?;

    for entry in jwalk::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = normalize_path(&entry.path());
        let kind = classify(&path, config);
        if kind == FileKind::Irrelevant {
            continue;
        }
        if let Some(signature) = Signature::read(&path) {
            files.insert(path, FileRecord { kind, signature });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    fn make_project() -> (TempDir, crate::config::ProjectConfig) {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        std::fs::create_dir_all(config.src_dir()).unwrap();
        std::fs::create_dir_all(config.template_dir()).unwrap();
        (temp, config)
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_tracks_relevant_files_only() {
        let (_tmp, config) = make_project();
        write(&config.src_dir().join("a.ts"), "class A {}");
        write(&config.src_dir().join("ui/b.exml"), "<e:Skin/>");
        write(&config.src_dir().join("readme.md"), "notes");
        write(&config.template_dir().join("index.html"), "<html/>");

        let state = DirectoryState::scan(&config).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.summary(), (1, 1, 1));
        assert!(state.is_tracked(&config.src_dir().join("a.ts")));
        assert!(state.is_tracked(&config.src_dir().join("ui/b.exml")));
        assert!(state.is_tracked(&config.template_dir().join("index.html")));
        assert!(!state.is_tracked(&config.src_dir().join("readme.md")));
    }

    #[test]
    fn test_scan_missing_src_is_error() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        assert!(DirectoryState::scan(&config).is_err());
    }

    #[test]
    fn test_check_changes_detects_add_modify_remove() {
        let (_tmp, config) = make_project();
        let a = config.src_dir().join("a.ts");
        let b = config.src_dir().join("b.ts");
        write(&a, "class A {}");
        write(&b, "class B {}");

        let state = DirectoryState::scan(&config).unwrap();

        // modify a (length change keeps the diff robust to mtime granularity),
        // remove b, add c
        write(&a, "class A { run() {} }");
        std::fs::remove_file(&b).unwrap();
        let c = config.src_dir().join("c.ts");
        write(&c, "class C {}");

        let changes = state.check_changes(&config).unwrap();
        assert_eq!(changes.added, vec![c]);
        assert_eq!(changes.modified, vec![a]);
        assert_eq!(changes.removed, vec![b]);
    }

    #[test]
    fn test_check_changes_clean_project() {
        let (_tmp, config) = make_project();
        write(&config.src_dir().join("a.ts"), "class A {}");
        let state = DirectoryState::scan(&config).unwrap();
        assert!(state.check_changes(&config).unwrap().is_empty());
    }

    #[test]
    fn test_apply_patches_snapshot() {
        let (_tmp, config) = make_project();
        let a = config.src_dir().join("a.ts");
        write(&a, "class A {}");
        let mut state = DirectoryState::scan(&config).unwrap();

        let c = config.src_dir().join("c.ts");
        write(&c, "class C {}");

        let mut changes = ChangeSet::default();
        changes.added.push(c.clone());
        changes.removed.push(a.clone());
        std::fs::remove_file(&a).unwrap();

        state.apply(&changes, &config);
        assert!(state.is_tracked(&c));
        assert!(!state.is_tracked(&a));

        // snapshot now matches the live tree again
        assert!(state.check_changes(&config).unwrap().is_empty());
    }

    #[test]
    fn test_tracked_answers_prior_existence() {
        let (_tmp, config) = make_project();
        write(&config.src_dir().join("a.ts"), "class A {}");
        let state = DirectoryState::scan(&config).unwrap();

        assert!(state.is_tracked(&config.src_dir().join("a.ts")));
        assert!(!state.is_tracked(&config.src_dir().join("new.ts")));
    }
}
