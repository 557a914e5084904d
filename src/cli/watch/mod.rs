//! `kestrel watch` - the build daemon.
//!
//! Binds the HTTP front-end, spawns the actor system, and serves build
//! requests until Ctrl+C.

mod http;
mod lifecycle;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;

use crate::config::ProjectConfig;
use crate::{core, log};

pub fn run_watch(config: &Arc<ProjectConfig>) -> Result<()> {
    config.validate_for_watch()?;

    let (server, addr) = lifecycle::bind_with_retry(config.watch.interface, config.watch.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    core::register_server(Arc::clone(&server), shutdown_tx);

    let (actor_handle, orchestrator) = lifecycle::spawn_actors(Arc::clone(config), shutdown_rx);

    log!("watch"; "watching {}", config.src_dir().display());
    log!("serve"; "build requests on http://{}/build", addr);

    http::run_request_loop(&server, &orchestrator);
    lifecycle::wait_for_shutdown(actor_handle);
    Ok(())
}
