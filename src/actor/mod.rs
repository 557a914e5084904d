//! Actor system wiring.
//!
//! One actor pair per project root:
//! - `FsActor` bridges watcher callbacks onto the orchestrator's queue
//! - `ProjectOrchestrator` owns all per-project build state
//!
//! The `Coordinator` creates the channels, wires the actors, and runs them
//! until a shutdown signal. `OrchestratorHandle` is the caller-facing
//! surface for external build requests.

pub mod fs;
pub mod messages;
pub mod orchestrator;
pub mod service;

pub use messages::{BuildError, BuildOutcome, BuildResult, OrchestratorMsg};
pub use orchestrator::ProjectOrchestrator;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::{mpsc, oneshot};

use crate::config::ProjectConfig;
use fs::FsActor;

const CHANNEL_BUFFER: usize = 64;

/// Caller-facing handle to one project's orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<OrchestratorMsg>,
}

impl OrchestratorHandle {
    pub(crate) fn new(tx: mpsc::Sender<OrchestratorMsg>) -> Self {
        Self { tx }
    }

    /// Request a build and await the cycle's outcome.
    pub async fn request_build(&self) -> BuildResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = OrchestratorMsg::BuildRequest { reply: reply_tx };
        if self.tx.send(msg).await.is_err() {
            return Err(BuildError::ShuttingDown);
        }
        reply_rx.await.unwrap_or(Err(BuildError::ShuttingDown))
    }

    /// Blocking variant for synchronous callers (the HTTP threads).
    pub fn request_build_blocking(&self) -> BuildResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = OrchestratorMsg::BuildRequest { reply: reply_tx };
        if self.tx.blocking_send(msg).is_err() {
            return Err(BuildError::ShuttingDown);
        }
        reply_rx.blocking_recv().unwrap_or(Err(BuildError::ShuttingDown))
    }
}

/// Coordinator - wires up and runs the actor pair for one project.
pub struct Coordinator {
    config: Arc<ProjectConfig>,
    tx: mpsc::Sender<OrchestratorMsg>,
    rx: mpsc::Receiver<OrchestratorMsg>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Create the coordinator and the handle callers use to reach it.
    pub fn new(config: Arc<ProjectConfig>) -> (Self, OrchestratorHandle) {
        let (tx, rx) = mpsc::channel::<OrchestratorMsg>(CHANNEL_BUFFER);
        let handle = OrchestratorHandle::new(tx.clone());
        (
            Self {
                config,
                tx,
                rx,
                shutdown_rx: None,
            },
            handle,
        )
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system until shutdown.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            tx,
            rx,
            shutdown_rx,
        } = self;

        // Orchestrator first: its initial scan is fatal on error.
        let orchestrator = ProjectOrchestrator::new(Arc::clone(&config), rx)?;
        let fs_actor = FsActor::new(Arc::clone(&config), tx.clone())
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;

        crate::debug!("actor"; "start");
        let mut orchestrator_handle = tokio::spawn(orchestrator.run());
        let fs_handle = tokio::spawn(fs_actor.run());

        if let Some(shutdown) = shutdown_rx {
            loop {
                if shutdown.try_recv().is_ok() {
                    crate::debug!("actor"; "shutdown signal received");
                    break;
                }
                if orchestrator_handle.is_finished() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        } else {
            tokio::select! {
                _ = fs_handle => {}
                res = &mut orchestrator_handle => {
                    let _ = res;
                    crate::debug!("actor"; "stopped");
                    return Ok(());
                }
            }
        }

        let _ = tx.send(OrchestratorMsg::Shutdown).await;
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            orchestrator_handle,
        )
        .await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
