//! HTTP routes: the editor WebSocket endpoint and a health check.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::ws;

/// Response for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    /// Documents with at least one live connection
    pub documents: usize,
    pub connections: usize,
}

/// Health check with live session counts.
///
/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.registry.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        store: state.documents.store_name().to_string(),
        documents: stats.documents,
        connections: stats.connections,
    })
}

/// Build the application router.
///
/// `/ws/editor/` (no id) is routed too, so the handshake completes and the
/// connection is then closed with a descriptive status.
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/ws/editor/", get(ws::ws_handler))
        .route("/ws/editor/{*path}", get(ws::ws_handler))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
