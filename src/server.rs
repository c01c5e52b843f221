//! The server module exposes the prettifier over HTTP.

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{FutureExt, StreamExt};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::constants::{EMPTY_INPUT_MESSAGE, MAX_BODY_BYTES};
use crate::prettify::Prettifier;

/// Body of both prettify endpoints.
#[derive(Debug, Deserialize, Serialize)]
pub struct PrettifyRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Problem details body for unexpected failures.
#[derive(Debug, Serialize)]
struct Problem {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
}

#[derive(Clone)]
struct AppState {
    prettifier: Arc<Prettifier>,
}

/// Builds the HTTP routes around a shared prettifier.
pub fn router(prettifier: Arc<Prettifier>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/prettify", post(prettify))
        .route("/prettify/stream", post(prettify_stream))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(AppState { prettifier })
}

/// Serves requests on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish, then the prettifier and its model
/// client are released.
///
/// # Errors
///
/// Returns an error if the listener fails while serving.
pub async fn serve<F>(listener: TcpListener, prettifier: Prettifier, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let app = router(Arc::new(prettifier));

    info!("Listening on http://{address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("Server stopped, model client released");
    Ok(())
}

async fn liveness() -> &'static str {
    "prettify-relay is running"
}

async fn prettify(
    State(state): State<AppState>,
    Json(request): Json<PrettifyRequest>,
) -> Response {
    if request.text.trim().is_empty() {
        return empty_input();
    }

    debug!("POST /prettify with {} bytes", request.text.len());
    let mut cancelled = CancelLog::armed();
    let outcome = AssertUnwindSafe(state.prettifier.prettify(&request.text))
        .catch_unwind()
        .await;
    cancelled.disarm();

    match outcome {
        Ok(output) => ([(CONTENT_TYPE, "application/json")], output).into_response(),
        Err(panic) => {
            let detail = format!("prettify call panicked: {}", panic_message(panic.as_ref()));
            error!("Prettify request failed: {detail}");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let problem = Problem {
                kind: "about:blank",
                title: "Internal Server Error",
                status: status.as_u16(),
                detail,
            };
            (
                status,
                [(CONTENT_TYPE, "application/problem+json")],
                Json(problem),
            )
                .into_response()
        }
    }
}

/// Logs when a blocking request is dropped before the model answers.
struct CancelLog {
    armed: bool,
}

impl CancelLog {
    fn armed() -> Self {
        Self { armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelLog {
    fn drop(&mut self) {
        if self.armed {
            info!("Prettify request cancelled by caller");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

async fn prettify_stream(
    State(state): State<AppState>,
    Json(request): Json<PrettifyRequest>,
) -> Response {
    if request.text.trim().is_empty() {
        return empty_input();
    }

    debug!("POST /prettify/stream with {} bytes", request.text.len());
    let chunks = state.prettifier.prettify_stream(&request.text);
    let body = Body::from_stream(chunks.map(Ok::<_, Infallible>));

    (
        [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}

fn empty_input() -> Response {
    debug!("Rejected empty input");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: EMPTY_INPUT_MESSAGE,
        }),
    )
        .into_response()
}
