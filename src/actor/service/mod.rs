//! Compiler Service Supervisor
//!
//! Owns the lifecycle of the out-of-process incremental compiler: spawn,
//! stdio channel setup, command dispatch, reply delivery, crash detection,
//! teardown. One instance per project; no shared global service.
//!
//! State machine:
//! ```text
//! Stopped -> Starting -> Ready -> (Busy <-> Ready) -> Stopped
//!                 \________________|________________/
//!                                  v
//!                               Crashed -> Stopped
//! ```
//! A crashed incarnation is never respawned spontaneously; the next build
//! request starts a fresh one.

pub mod protocol;


use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::config::ProjectConfig;
use crate::log;
use protocol::{BuildCommand, BuildReport, decode_reply};

/// Supervisor states. `Starting` and `Crashed` are transited through inside
/// a single call; they exist so logs and tests can observe the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Ready,
    Busy,
    Crashed,
}

/// Async input from the service subprocess, tagged with the incarnation that
/// produced it so events from a killed process cannot be mistaken for the
/// live one.
#[derive(Debug)]
pub struct ServiceEvent {
    pub generation: u64,
    pub payload: ServicePayload,
}

#[derive(Debug)]
pub enum ServicePayload {
    /// A well-formed reply line
    Reply(BuildReport),
    /// stdout closed: the process exited or abandoned the channel
    Eof,
}

/// Supervises one project's compiler service subprocess.
pub struct ServiceSupervisor {
    config: Arc<ProjectConfig>,
    event_tx: mpsc::Sender<ServiceEvent>,
    state: ServiceState,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    generation: u64,
    dispatched_at: Option<Instant>,
    reply_timeout: Duration,
}

impl ServiceSupervisor {
    /// Create a supervisor in `Stopped` and the event channel its reader
    /// tasks feed.
    pub fn new(config: Arc<ProjectConfig>) -> (Self, mpsc::Receiver<ServiceEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let reply_timeout = config.watch.reply_timeout();
        (
            Self {
                config,
                event_tx,
                state: ServiceState::Stopped,
                child: None,
                stdin: None,
                generation: 0,
                dispatched_at: None,
                reply_timeout,
            },
            event_rx,
        )
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == ServiceState::Busy
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Does this event belong to the live incarnation?
    pub fn accepts(&self, event: &ServiceEvent) -> bool {
        self.child.is_some() && event.generation == self.generation
    }

    /// When the in-flight command must be considered lost.
    pub fn reply_deadline(&self) -> Option<Instant> {
        self.dispatched_at.map(|t| t + self.reply_timeout)
    }

    /// Dispatch one build command, starting the service first if needed.
    ///
    /// The caller guarantees no command is in flight; `Busy` gating lives in
    /// the orchestrator's deferred queue.
    pub async fn dispatch(&mut self, files: &[PathBuf]) -> Result<()> {
        debug_assert!(!self.is_busy(), "dispatch while busy");

        if self.child.is_none()
            && let Err(e) = self.start().await
        {
            self.state = ServiceState::Stopped;
            return Err(e);
        }

        let line = BuildCommand::new(files)
            .encode()
            .context("failed to encode build command")?;
        let Some(stdin) = self.stdin.as_mut() else {
            anyhow::bail!("build service stdin closed");
        };
        stdin
            .write_all(line.as_bytes())
            .await
            .context("failed to write to build service")?;
        stdin
            .flush()
            .await
            .context("failed to flush build service channel")?;

        self.state = ServiceState::Busy;
        self.dispatched_at = Some(Instant::now());
        crate::debug!("service"; "dispatched {} file(s)", files.len());
        Ok(())
    }

    /// Spawn a fresh incarnation: `Stopped -> Starting -> Ready`.
    ///
    /// The channel counts as writable once the pipes exist; a broken pipe
    /// surfaces on the first dispatch and is handled as a crash there.
    async fn start(&mut self) -> Result<()> {
        self.state = ServiceState::Starting;
        self.generation += 1;

        let cmd = &self.config.service.command;
        let program = cmd
            .first()
            .ok_or_else(|| anyhow!("service.command is empty"))?;
        log!("service"; "starting `{}`", program);

        let mut child = Command::new(program)
            .args(&cmd[1..])
            .arg(&self.config.root)
            .current_dir(&self.config.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `{program}`"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("build service stdout unavailable"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("build service stdin unavailable"))?;

        tokio::spawn(read_replies(stdout, self.event_tx.clone(), self.generation));

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.state = ServiceState::Ready;
        Ok(())
    }

    /// A well-formed reply for the in-flight command arrived: `Busy -> Ready`.
    pub fn mark_idle(&mut self) {
        self.dispatched_at = None;
        if self.state == ServiceState::Busy {
            self.state = ServiceState::Ready;
        }
    }

    /// The incarnation died (observed EOF): reap it and return to `Stopped`.
    ///
    /// Returns the exit status when one could be collected.
    pub async fn reap(&mut self) -> Option<std::process::ExitStatus> {
        self.state = ServiceState::Crashed;
        let status = match self.child.take() {
            Some(mut child) => {
                // kill first: EOF with a still-running process means the
                // channel was abandoned, which is just as dead
                let _ = child.start_kill();
                child.wait().await.ok()
            }
            None => None,
        };
        self.stdin = None;
        self.dispatched_at = None;
        self.state = ServiceState::Stopped;
        status
    }

    /// Forcibly terminate the service without waiting for in-flight replies.
    ///
    /// Safe to call in any state; leaves the supervisor `Stopped`.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            crate::debug!("service"; "stopping");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        self.stdin = None;
        self.dispatched_at = None;
        self.state = ServiceState::Stopped;
    }
}

/// Read newline-delimited JSON replies until EOF, forwarding well-formed
/// ones and dropping the rest.
async fn read_replies(stdout: ChildStdout, tx: mpsc::Sender<ServiceEvent>, generation: u64) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match decode_reply(line) {
                    Some(report) => {
                        let event = ServiceEvent {
                            generation,
                            payload: ServicePayload::Reply(report),
                        };
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    None => {
                        log!("service"; "malformed reply discarded: {}", preview(line));
                    }
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
    let _ = tx
        .send(ServiceEvent {
            generation,
            payload: ServicePayload::Eof,
        })
        .await;
}

/// First chunk of a wire line, for logs.
fn preview(line: &str) -> &str {
    let end = line
        .char_indices()
        .nth(120)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}
