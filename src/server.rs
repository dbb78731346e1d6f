//! HTTP surface over the pipeline
//!
//! `smartmerge serve` → `GET /process_prs/{owner}/{repo}` runs one repository
//! end to end and returns its predictions as JSON.

use serde_json::{json, Value};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Handle;
use tracing::{error, info, instrument, warn};

use crate::pipeline::Pipeline;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Server thread stopped unexpectedly: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Welcome,
    ProcessPrs { owner: String, repo: String },
    MethodNotAllowed,
    NotFound,
}

/// Map a request line onto a [`Route`]. Query strings are ignored.
pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or("/");
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let matched = match segments.as_slice() {
        [""] => Route::Welcome,
        ["process_prs", owner, repo] if !owner.is_empty() && !repo.is_empty() => Route::ProcessPrs {
            owner: owner.to_string(),
            repo: repo.to_string(),
        },
        _ => return Route::NotFound,
    };

    if *method == Method::Get {
        matched
    } else {
        Route::MethodNotAllowed
    }
}

/// Status code and JSON body for a routed request.
pub async fn respond(pipeline: &Pipeline, route: Route) -> (u16, Value) {
    match route {
        Route::Welcome => (200, json!({ "message": "Welcome to SmartMerge API" })),
        Route::ProcessPrs { owner, repo } => match pipeline.process_repository(&owner, &repo).await {
            Ok(outcome) => (
                200,
                json!({
                    "message": "PRs processed successfully",
                    "merge_predictions": outcome.predictions,
                    "fetch_errors": outcome.fetch_errors,
                }),
            ),
            Err(e) => {
                error!(%owner, %repo, error = %e, "pipeline failed");
                (500, json!({ "detail": e.to_string() }))
            }
        },
        Route::MethodNotAllowed => (405, json!({ "detail": "Method Not Allowed" })),
        Route::NotFound => (404, json!({ "detail": "Not found" })),
    }
}

/// Serve until the process is stopped. Requests are handled one at a time on
/// a blocking thread; each pipeline run is driven on the current runtime.
#[instrument(skip(pipeline))]
pub async fn start(pipeline: Pipeline, host: &str, port: u16) -> Result<(), ServerError> {
    let addr = format!("{host}:{port}");
    let server = Server::http(&addr).map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;
    info!(%addr, "SmartMerge API listening");
    println!("SmartMerge API listening on http://{addr}");
    println!("Press Ctrl+C to stop");

    let runtime = Handle::current();
    tokio::task::spawn_blocking(move || {
        for request in server.incoming_requests() {
            handle_request(&runtime, &pipeline, request);
        }
    })
    .await?;
    Ok(())
}

fn handle_request(runtime: &Handle, pipeline: &Pipeline, request: Request) {
    let route = route(request.method(), request.url());
    info!(method = %request.method(), url = request.url(), ?route, "request");
    let (status, body) = runtime.block_on(respond(pipeline, route));

    let mut response = Response::from_string(body.to_string()).with_status_code(status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to write response");
    }
}
