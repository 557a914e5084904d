//! Actor Message Definitions
//!
//! Message types for the per-project actor pair.
//!
//! ```text
//! FsActor --FileEvent--> Orchestrator <--ServiceEvent-- compiler subprocess
//!                        ^
//!                        `--BuildRequest-- HTTP front-end
//! ```

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::actor::service::protocol::BuildReport;
use crate::build::FullBuildReport;
use crate::project::ChangeKind;

/// Messages to the Project Orchestrator
#[derive(Debug)]
pub enum OrchestratorMsg {
    /// One classified watcher event (already mapped and filtered)
    FileEvent { path: PathBuf, kind: ChangeKind },
    /// External caller awaiting the next build cycle's outcome
    BuildRequest {
        reply: oneshot::Sender<BuildResult>,
    },
    /// Shutdown
    Shutdown,
}

/// What a caller gets back for one build cycle.
pub type BuildResult = Result<BuildOutcome, BuildError>;

/// Successful build cycle outcomes
#[derive(Debug)]
pub enum BuildOutcome {
    /// The compiler service's reply to an incremental build
    Incremental(BuildReport),
    /// A whole-project rebuild completed
    Full(FullBuildReport),
    /// Nothing to build
    Clean,
}

/// Caller-visible build failures
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build service unavailable; changes will be retried on the next build cycle")]
    ServiceUnavailable,

    #[error("a build request is already pending for this project")]
    RequestPending,

    #[error("whole-project rebuild failed: {0}")]
    Rebuild(String),

    #[error("the build daemon is shutting down")]
    ShuttingDown,
}
