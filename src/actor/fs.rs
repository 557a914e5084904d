//! FileSystem Actor
//!
//! Bridges the `notify` watcher to the orchestrator's message queue.
//! Implements the "Watcher-First" pattern for zero event loss: the watcher
//! starts buffering immediately, before the orchestrator begins consuming.
//!
//! No debounce here. Callbacks only enqueue; the quiescence window belongs
//! to the orchestrator's change aggregator.

use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::messages::OrchestratorMsg;
use crate::config::ProjectConfig;
use crate::project::{ChangeKind, FileKind, classify};
use crate::utils::path::normalize_path;

/// FileSystem Actor - watches the source and template roots
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// Channel to the orchestrator
    orchestrator_tx: mpsc::Sender<OrchestratorMsg>,
    /// Project configuration for classification
    config: Arc<ProjectConfig>,
}

impl FsActor {
    /// Create a new FsActor with the watcher already attached.
    ///
    /// Events start buffering in `notify_rx` while the caller finishes its
    /// initial scan, eliminating the vacuum between scan and watch.
    pub fn new(
        config: Arc<ProjectConfig>,
        orchestrator_tx: mpsc::Sender<OrchestratorMsg>,
    ) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        watcher.watch(config.src_dir(), RecursiveMode::Recursive)?;
        // The template tree may not exist yet; watch it when it does.
        if config.template_dir().is_dir() {
            watcher.watch(config.template_dir(), RecursiveMode::Recursive)?;
        }

        Ok(Self {
            notify_rx,
            watcher,
            orchestrator_tx,
            config,
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let orchestrator_tx = self.orchestrator_tx;
        let config = self.config;
        let _watcher = self.watcher;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        while let Some(event) = async_rx.recv().await {
            let Some(kind) = map_event_kind(&event.kind) else {
                continue;
            };
            for path in &event.paths {
                if is_temp_file(path) {
                    continue;
                }
                let path = normalize_path(path);
                // directories are ignore-but-traverse: the recursive watcher
                // descends on its own, their events never become changes
                if path.is_dir() {
                    continue;
                }
                if classify(&path, &config) == FileKind::Irrelevant {
                    continue;
                }
                let msg = OrchestratorMsg::FileEvent { path, kind };
                if orchestrator_tx.send(msg).await.is_err() {
                    return; // Orchestrator shut down
                }
            }
        }
    }
}

/// Map a raw notify event kind onto a change kind.
///
/// Metadata-only modifications (mtime/atime/chmod noise) are dropped: they
/// may trigger endless rebuild loops.
fn map_event_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(modify) => {
            if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                None
            } else {
                Some(ChangeKind::Modified)
            }
        }
        _ => None,
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
