//! HTTP front-end for external build requests.
//!
//! `GET`/`POST /build` blocks until the correlated build cycle resolves and
//! answers with the cycle's outcome: the service's own reply for incremental
//! builds (mirroring the wire protocol), a summary for full rebuilds.

use std::io::Cursor;

use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::actor::{BuildError, BuildOutcome, OrchestratorHandle};
use crate::log;

/// Accept requests until the server is unblocked by the shutdown handler.
pub fn run_request_loop(server: &Server, handle: &OrchestratorHandle) {
    for request in server.incoming_requests() {
        if crate::core::is_shutdown() {
            break;
        }
        // One thread per request: a /build caller blocks for the whole
        // cycle and must not stall other callers.
        let handle = handle.clone();
        std::thread::spawn(move || handle_request(request, &handle));
    }
}

fn handle_request(request: Request, handle: &OrchestratorHandle) {
    let response = match (request.method(), request.url()) {
        (Method::Get | Method::Post, "/build") => build_response(handle),
        _ => json_response(404, json!({"error": "not found"}).to_string()),
    };
    if let Err(e) = request.respond(response) {
        log!("serve"; "request error: {e}");
    }
}

fn build_response(handle: &OrchestratorHandle) -> Response<Cursor<Vec<u8>>> {
    match handle.request_build_blocking() {
        Ok(BuildOutcome::Incremental(report)) => {
            let body = serde_json::to_string(&report)
                .unwrap_or_else(|_| json!({"command": "build"}).to_string());
            json_response(200, body)
        }
        Ok(BuildOutcome::Full(report)) => json_response(
            200,
            json!({
                "command": "build",
                "mode": "full",
                "transpiled": report.transpiled,
                "copied": report.copied,
                "errors": report.errors,
            })
            .to_string(),
        ),
        Ok(BuildOutcome::Clean) => {
            json_response(200, json!({"command": "build", "mode": "none"}).to_string())
        }
        Err(e) => {
            let code = match e {
                BuildError::RequestPending => 409,
                BuildError::ServiceUnavailable | BuildError::ShuttingDown => 503,
                BuildError::Rebuild(_) => 500,
            };
            json_response(code, json!({"error": e.to_string()}).to_string())
        }
    }
}

fn json_response(code: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(code)
        .with_header(Header::from_bytes("Content-Type", "application/json").unwrap())
}
