//! HTTP ingestion surface.
//!
//! - `POST /send` accepts any JSON body, buffers it and echoes it back.
//! - `GET /healthy` always answers `OK`.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::engine::BatchEngine;
use crate::error::EngineError;

/// Build the router. Malformed bodies are rejected by the `Json`
/// extractor before anything reaches the engine.
pub fn router(engine: Arc<BatchEngine>) -> Router {
    Router::new()
        .route("/send", post(send))
        .route("/healthy", get(healthy))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn send(
    State(engine): State<Arc<BatchEngine>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    debug!(input = %body, "received record");
    match engine.add_record(body.clone()) {
        Ok(()) => Ok(Json(body)),
        Err(e @ EngineError::Stopped) => Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn healthy() -> &'static str {
    "OK"
}

/// Serve until `shutdown` resolves, then stop accepting connections and
/// let in-flight requests finish.
///
/// The engine is not shut down here; the caller owns its lifecycle.
pub async fn serve<F>(
    listener: TcpListener,
    engine: Arc<BatchEngine>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}
