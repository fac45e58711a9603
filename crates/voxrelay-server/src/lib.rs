//! Voxrelay server library logic.

pub mod config;
pub mod gateway;

use axum::{routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use voxrelay_core::{PipelineOrchestrator, Priming};

/// Application state shared across all connections.
///
/// Holds the process-wide orchestrator (which owns the two external-service
/// handles) and the persona priming pair. Per-connection state lives in the
/// gateway, not here.
pub struct AppState {
    /// The per-utterance pipeline, shared by every connection.
    pub orchestrator: PipelineOrchestrator,
    /// Priming pair seeded into each new session.
    pub priming: Priming,
    /// Directory of browser client assets, served at `/`.
    pub client_dir: String,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let client_dir = state.client_dir.clone();

    let router = Router::new()
        .route("/health", get(health))
        .route("/ws", get(gateway::ws_handler));

    // Serve the browser client (speech capture + playback) if present.
    let router = if std::path::Path::new(&client_dir).join("index.html").exists() {
        tracing::info!(path = %client_dir, "serving client static files");
        let index = format!("{}/index.html", client_dir);
        router.fallback_service(ServeDir::new(&client_dir).fallback(ServeFile::new(index)))
    } else {
        tracing::info!(path = %client_dir, "client directory not found, skipping static file serving");
        router
    };

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
