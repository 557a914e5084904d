//! Project Orchestrator
//!
//! The single-owner state machine for one project root. Owns the directory
//! snapshot, the pending change set, the debounce deadline, the pending
//! caller slot, and the compiler service supervisor. Everything reaches it
//! through one message queue; watcher callbacks and HTTP threads only
//! enqueue.
//!
//! Build cycle: drain (or diff) -> decide -> full rebuild, or translate +
//! dispatch to the live service. Cycles for one project are strictly
//! sequential; a cycle that lands while a command is in flight parks its
//! changes in a single deferred slot that newer cycles merge into, so the
//! reply is followed by exactly one dispatch carrying the union.


use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

use crate::build::{Translators, full};
use crate::config::ProjectConfig;
use crate::log;
use crate::logger;
use crate::project::{
    BuildPlan, ChangeAggregator, ChangeKind, ChangeSet, DirectoryState, decide,
};

use super::messages::{BuildError, BuildOutcome, BuildResult, OrchestratorMsg};
use super::service::{ServiceEvent, ServicePayload, ServiceSupervisor};

/// Sleep target when nothing is scheduled.
const IDLE: Duration = Duration::from_secs(86400);

/// Per-project orchestrator task state.
pub struct ProjectOrchestrator {
    config: Arc<ProjectConfig>,
    rx: mpsc::Receiver<OrchestratorMsg>,
    service_rx: mpsc::Receiver<ServiceEvent>,
    service: ServiceSupervisor,
    state: DirectoryState,
    aggregator: ChangeAggregator,
    translators: Translators,
    /// At most one external caller awaits a cycle outcome.
    pending: Option<oneshot::Sender<BuildResult>>,
    /// Changes dispatched to the service, kept for crash re-absorption.
    inflight: Option<ChangeSet>,
    /// Changes waiting behind a busy service; newer cycles merge in.
    deferred: Option<ChangeSet>,
}

impl ProjectOrchestrator {
    /// Initialize for one project root: scan the directory once and wire the
    /// supervisor. Scan failures are fatal; no partial state is kept.
    pub fn new(config: Arc<ProjectConfig>, rx: mpsc::Receiver<OrchestratorMsg>) -> Result<Self> {
        let state = DirectoryState::scan(&config)?;
        let (service, service_rx) = ServiceSupervisor::new(Arc::clone(&config));
        let aggregator = ChangeAggregator::new(config.watch.debounce());
        let translators = Translators::from_config(&config);
        Ok(Self {
            config,
            rx,
            service_rx,
            service,
            state,
            aggregator,
            translators,
            pending: None,
            inflight: None,
            deferred: None,
        })
    }

    /// Run the orchestrator event loop until shutdown.
    pub async fn run(mut self) {
        let (typed, markup, template) = self.state.summary();
        crate::debug!(
            "watch";
            "orchestrator started, tracking {} typed / {} markup / {} template file(s)",
            typed, markup, template
        );
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;
                msg = self.rx.recv() => {
                    match msg {
                        Some(OrchestratorMsg::FileEvent { path, kind }) => {
                            self.on_file_event(path, kind);
                        }
                        Some(OrchestratorMsg::BuildRequest { reply }) => {
                            self.on_build_request(reply).await;
                        }
                        Some(OrchestratorMsg::Shutdown) | None => {
                            self.shutdown().await;
                            return;
                        }
                    }
                }
                Some(event) = self.service_rx.recv() => {
                    self.on_service_event(event).await;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.on_deadline().await;
                }
            }
        }
    }

    /// Earliest of the debounce deadline and the reply deadline.
    fn next_deadline(&self) -> Instant {
        let far = Instant::now() + IDLE;
        let debounce = self.aggregator.deadline().unwrap_or(far);
        let reply = self.service.reply_deadline().unwrap_or(far);
        debounce.min(reply)
    }

    fn on_file_event(&mut self, path: std::path::PathBuf, kind: ChangeKind) {
        let tracked = self.state.is_tracked(&path);
        self.aggregator.record(path, kind, tracked);
    }

    /// External build request: at most one caller may be outstanding.
    ///
    /// With no edits pending and no command in flight the debounce window is
    /// bypassed; otherwise the caller latches onto the scheduled cycle (or
    /// the in-flight one).
    async fn on_build_request(&mut self, reply: oneshot::Sender<BuildResult>) {
        if self.pending.is_some() {
            let _ = reply.send(Err(BuildError::RequestPending));
            return;
        }
        self.pending = Some(reply);
        if self.aggregator.deadline().is_none() && !self.service.is_busy() {
            self.run_cycle().await;
        }
    }

    async fn on_service_event(&mut self, event: ServiceEvent) {
        if !self.service.accepts(&event) {
            crate::debug!("service"; "stale service event ignored");
            return;
        }
        match event.payload {
            ServicePayload::Reply(report) => self.on_reply(report).await,
            ServicePayload::Eof => {
                self.service.reap().await;
                self.fail_service_cycle("build service stopped unexpectedly")
                    .await;
            }
        }
    }

    /// A well-formed reply resolved the in-flight command.
    async fn on_reply(&mut self, report: super::service::protocol::BuildReport) {
        if !self.service.is_busy() {
            crate::debug!("service"; "unsolicited reply ignored");
            return;
        }
        self.service.mark_idle();

        let built = self.inflight.take().map(|c| c.len()).unwrap_or(0);
        logger::status_success(&format!("incremental build: {built} file(s)"));
        self.resolve_pending(Ok(BuildOutcome::Incremental(report)));

        // exactly one follow-up dispatch carries everything that queued up
        if let Some(deferred) = self.deferred.take() {
            self.dispatch_changes(deferred).await;
        }
    }

    /// Either deadline fired; figure out which and act.
    async fn on_deadline(&mut self) {
        let now = Instant::now();
        if self.service.reply_deadline().is_some_and(|d| now >= d) {
            // a reply that never arrives is a crash-equivalent failure
            log!(
                "service";
                "no reply within {}ms, treating the service as crashed",
                self.config.watch.reply_timeout_ms
            );
            self.fail_service_cycle("build service timed out").await;
        }
        if self.aggregator.is_due(now) {
            self.run_cycle().await;
        }
    }

    /// Uniform subprocess-failure handling: fail the caller, re-absorb the
    /// affected changes for the next cycle, and stay stopped until a new
    /// request arrives (no retry storm).
    async fn fail_service_cycle(&mut self, summary: &str) {
        self.service.stop().await;
        logger::status_error(summary, "changes will be retried on the next build cycle");
        self.resolve_pending(Err(BuildError::ServiceUnavailable));
        if let Some(inflight) = self.inflight.take() {
            self.aggregator.reabsorb(inflight);
        }
        if let Some(deferred) = self.deferred.take() {
            self.aggregator.reabsorb(deferred);
        }
    }

    /// One build cycle: drain the aggregator, or diff the directory when a
    /// caller asked for a build without any recorded events.
    async fn run_cycle(&mut self) {
        let changes = match self.aggregator.drain() {
            Some(changes) => changes,
            None if self.pending.is_some() => match self.state.check_changes(&self.config) {
                Ok(changes) => changes,
                Err(e) => {
                    log!("error"; "project scan failed: {:#}", e);
                    ChangeSet::default()
                }
            },
            None => return,
        };

        if changes.is_empty() {
            logger::status_unchanged("nothing to build");
            self.resolve_pending(Ok(BuildOutcome::Clean));
            return;
        }
        self.dispatch_changes(changes).await;
    }

    async fn dispatch_changes(&mut self, changes: ChangeSet) {
        match decide(&changes, &self.config) {
            BuildPlan::Full => self.run_full_rebuild(changes).await,
            BuildPlan::Incremental(files) => self.run_incremental(changes, files).await,
        }
    }

    /// Structural change: kill the service without waiting for in-flight
    /// replies and rebuild the whole project. The supervisor stays stopped
    /// until the next incremental request.
    async fn run_full_rebuild(&mut self, changes: ChangeSet) {
        self.service.stop().await;
        // the project-wide rebuild subsumes whatever was in flight or queued
        self.inflight = None;
        self.deferred = None;

        let config = Arc::clone(&self.config);
        let result = tokio::task::spawn_blocking(move || full::rebuild_whole_project(&config)).await;

        match result {
            Ok(Ok(report)) => {
                if let Err(e) = self.state.rescan(&self.config) {
                    log!("error"; "rescan after rebuild failed: {:#}", e);
                }
                logger::status_success(&format!(
                    "full rebuild: {} transpiled, {} copied, {} error(s)",
                    report.transpiled, report.copied, report.errors
                ));
                self.resolve_pending(Ok(BuildOutcome::Full(report)));
            }
            Ok(Err(e)) => {
                logger::status_error("full rebuild failed", &format!("{e:#}"));
                self.aggregator.reabsorb(changes);
                self.resolve_pending(Err(BuildError::Rebuild(format!("{e:#}"))));
            }
            Err(join) => {
                logger::status_error("full rebuild failed", &join.to_string());
                self.aggregator.reabsorb(changes);
                self.resolve_pending(Err(BuildError::Rebuild(join.to_string())));
            }
        }
    }

    /// Content-only changes: translate markup/templates in-process, then
    /// hand the file list to the live service.
    async fn run_incremental(&mut self, changes: ChangeSet, files: Vec<std::path::PathBuf>) {
        if self.service.is_busy() {
            // single queued slot; the newest cycle subsumes the older one
            match &mut self.deferred {
                Some(deferred) => deferred.merge(changes),
                None => self.deferred = Some(changes),
            }
            crate::debug!("service"; "busy, deferring dispatch");
            return;
        }

        let translate_errors = self.translators.apply(&changes, &self.config);
        if translate_errors > 0 {
            log!("watch"; "{} file(s) failed to translate", translate_errors);
        }
        self.state.apply(&changes, &self.config);

        match self.service.dispatch(&files).await {
            Ok(()) => {
                self.inflight = Some(changes);
            }
            Err(e) => {
                log!("error"; "failed to reach build service: {:#}", e);
                self.aggregator.reabsorb(changes);
                self.fail_service_cycle("build service unreachable").await;
            }
        }
    }

    fn resolve_pending(&mut self, result: BuildResult) {
        if let Some(reply) = self.pending.take() {
            let _ = reply.send(result);
        }
    }

    /// Safe in any state: cancel deadlines, fail the caller, terminate the
    /// subprocess. Leaves no orphan.
    async fn shutdown(&mut self) {
        crate::debug!("watch"; "orchestrator shutting down");
        self.resolve_pending(Err(BuildError::ShuttingDown));
        self.inflight = None;
        self.deferred = None;
        self.service.stop().await;
    }
}
